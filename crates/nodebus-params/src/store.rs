//! # Parameter Store
//!
//! Owner-side API: collect node defaults, apply the file patch, freeze.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ParamError;
use crate::params::Params;
use crate::patch::{merge_patch, namespaced, segments, set_path};
use crate::source::ParamSource;

/// Write handle given to a node's defaults hook.
///
/// Keys may use the `~` placeholder for the node's own name. Hooks only
/// declare values; there is no getter.
pub struct ParamDefaults<'a> {
    doc: &'a mut Value,
    node: &'a str,
}

impl<'a> ParamDefaults<'a> {
    /// Name of the node whose defaults are being declared.
    #[must_use]
    pub fn node(&self) -> &str {
        self.node
    }

    /// Set (or overwrite) a single value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ParamError> {
        set_path(self.doc, &namespaced(key, self.node), value.into())
    }

    /// Merge-patch a sub-document in at `key`.
    pub fn merge(&mut self, key: &str, patch: Value) -> Result<(), ParamError> {
        let key = namespaced(key, self.node);
        let wrapped = segments(&key)?
            .into_iter()
            .rev()
            .fold(patch, |inner, part| {
                let mut map = Map::new();
                map.insert(part.to_string(), inner);
                Value::Object(map)
            });
        merge_patch(self.doc, &wrapped);
        Ok(())
    }
}

/// The shared parameter document in its two phases.
///
/// While open it is only touched by the thread setting up the runtime. After
/// [`finalize`](Self::finalize) it is handed out as an immutable [`Params`].
pub struct ParameterStore {
    data: Value,
    frozen: Option<Params>,
}

impl ParameterStore {
    /// Create an empty, open store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
            frozen: None,
        }
    }

    /// Let `node` add its default values.
    ///
    /// # Errors
    ///
    /// [`ParamError::Frozen`] after finalize, or whatever the hook returns.
    pub fn declare_defaults<F>(&mut self, node: &str, hook: F) -> Result<(), ParamError>
    where
        F: FnOnce(&mut ParamDefaults<'_>) -> Result<(), ParamError>,
    {
        self.ensure_open()?;
        let mut defaults = ParamDefaults {
            doc: &mut self.data,
            node,
        };
        hook(&mut defaults)?;
        debug!(node, "Defaults declared");
        Ok(())
    }

    /// Merge-patch an in-memory document over the current contents.
    pub fn apply_patch(&mut self, patch: &Value) -> Result<(), ParamError> {
        self.ensure_open()?;
        merge_patch(&mut self.data, patch);
        Ok(())
    }

    /// Read the patch file named by `source` and merge it in.
    ///
    /// Returns `true` if a file was applied, `false` if an optional default
    /// file was absent.
    pub fn load_patch(&mut self, source: &ParamSource) -> Result<bool, ParamError> {
        self.ensure_open()?;
        let Some(patch) = source.read()? else {
            return Ok(false);
        };

        merge_patch(&mut self.data, &patch);
        info!(path = %source.path().display(), "Parameter file applied");
        Ok(true)
    }

    /// Freeze the document and return the shared read-only view.
    ///
    /// Calling it again returns the same view.
    pub fn finalize(&mut self) -> Params {
        if let Some(params) = &self.frozen {
            return params.clone();
        }

        let params = Params::new(std::mem::take(&mut self.data));
        self.frozen = Some(params.clone());
        params
    }

    /// Whether [`finalize`](Self::finalize) has run.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.frozen.is_some()
    }

    /// The merged document, or `None` while still open.
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        self.frozen.as_ref().map(Params::document)
    }

    /// Cloneable view for node threads, or `None` while still open.
    #[must_use]
    pub fn snapshot(&self) -> Option<Params> {
        self.frozen.clone()
    }

    fn ensure_open(&self) -> Result<(), ParamError> {
        if self.frozen.is_some() {
            return Err(ParamError::Frozen);
        }
        Ok(())
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
