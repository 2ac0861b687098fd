//! # Frozen Parameters
//!
//! Read-only, lock-free view handed to every node thread.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ParamError;
use crate::patch::{lookup, namespaced};

/// Immutable snapshot of the merged parameter document.
///
/// Cloning is an `Arc` bump; every clone sees the same document.
#[derive(Debug, Clone)]
pub struct Params {
    doc: Arc<Value>,
}

impl Params {
    pub(crate) fn new(doc: Value) -> Self {
        Self { doc: Arc::new(doc) }
    }

    /// Build a frozen view directly, bypassing the store.
    ///
    /// Mostly useful for running a single node body in tests.
    #[must_use]
    pub fn from_value(doc: Value) -> Self {
        Self::new(doc)
    }

    /// The whole document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.doc
    }

    /// Raw value at a `/`-separated key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        lookup(&self.doc, key)
    }

    /// Deserialize the value at a `/`-separated key.
    ///
    /// # Errors
    ///
    /// - [`ParamError::NotFound`] if nothing is stored at `key`
    /// - [`ParamError::Type`] if the value does not deserialize into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ParamError> {
        let value = self.value(key).ok_or_else(|| ParamError::NotFound {
            key: key.to_string(),
        })?;
        T::deserialize(value).map_err(|source| ParamError::Type {
            key: key.to_string(),
            source,
        })
    }

    /// [`get_as`](Self::get_as) after expanding the `~` placeholder to `node`.
    pub fn node_get_as<T: DeserializeOwned>(&self, node: &str, key: &str) -> Result<T, ParamError> {
        self.get_as(&namespaced(key, node))
    }
}
