//! Named parameter storage for the model being compressed.

use std::collections::BTreeMap;

use candle_core::Tensor;

use crate::error::{BinarizeError, Result};

/// Ordered collection of named parameter tensors.
///
/// Names follow the usual `layer.weight` / `layer.bias` convention.
/// Iteration is in name order so binarization passes are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    tensors: BTreeMap<String, Tensor>,
}

impl ParamStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, returning the previous tensor if any.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.insert(name, tensor);
        self
    }

    /// Get a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Get a parameter by name, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`BinarizeError::MissingParameter`] if no parameter has this name.
    pub fn require(&self, name: &str) -> Result<&Tensor> {
        self.get(name)
            .ok_or_else(|| BinarizeError::MissingParameter(name.to_string()))
    }

    /// Replace an existing parameter, keeping its shape.
    ///
    /// # Errors
    ///
    /// Returns error if the parameter is missing or the shapes differ.
    pub fn replace(&mut self, name: &str, tensor: Tensor) -> Result<Tensor> {
        let existing = self
            .tensors
            .get_mut(name)
            .ok_or_else(|| BinarizeError::MissingParameter(name.to_string()))?;

        if existing.dims() != tensor.dims() {
            return Err(BinarizeError::ShapeMismatch {
                expected: existing.dims().to_vec(),
                actual: tensor.dims().to_vec(),
            });
        }

        Ok(std::mem::replace(existing, tensor))
    }

    /// Parameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Iterate over `(name, tensor)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the store holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total number of scalar elements across all parameters.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.tensors.values().map(Tensor::elem_count).sum()
    }
}
