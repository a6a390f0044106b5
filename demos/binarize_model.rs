//! Binarize a small MLP with each built-in strategy.
//!
//! Run with: `RUST_LOG=debug cargo run --example binarize_model`

use binarize_rs::{BinarizationStrategy, OptionMap, ParamStore, StrategyRegistry};
use candle_core::{DType, Device, Tensor};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> binarize_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Binarization Demo ===\n");

    let device = Device::Cpu;
    let params = ParamStore::new()
        .with("fc1.weight", Tensor::randn(0.0f32, 0.1, (256, 784), &device)?)
        .with("fc1.bias", Tensor::zeros(256, DType::F32, &device)?)
        .with("fc2.weight", Tensor::randn(0.0f32, 0.1, (10, 256), &device)?)
        .with("fc2.bias", Tensor::zeros(10, DType::F32, &device)?);

    println!(
        "Model: {} parameters, {} elements\n",
        params.len(),
        params.num_elements()
    );

    let registry = StrategyRegistry::with_builtin();
    let mut options = OptionMap::new();
    options.insert("bits".to_string(), json!(1));

    for name in registry.names() {
        let mut strategy = registry.create(name, options.clone(), params.clone())?;
        let report = strategy.binarize()?;

        println!("Strategy: {name}");
        println!("  binarized: {:?}", report.binarized);
        println!("  skipped:   {:?}", report.skipped);
        println!("  ratio:     {:.2}x\n", report.compression_ratio());
    }

    Ok(())
}
