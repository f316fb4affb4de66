/// Named JSON documents under `settings/`, one file per name.
///
/// Documents are opaque to the store and replaced wholesale on every write;
/// nothing is merged. Writes go through a `.<name>.tmp` file and a rename.
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Span;

use crate::error::{json_error, Result, StoreError};
use crate::files::{read_optional, write_atomic};
use crate::layout::validate_name;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
    span: Span,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(dir: P, span: Span) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            span,
        }
    }

    pub fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Returns the stored document for `name`.
    ///
    /// If nothing is stored and `defaults` is given, the defaults are written
    /// and returned.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoSettings`] if nothing is stored and there are no
    /// defaults; [`StoreError::Json`] if the stored file is not valid JSON.
    pub fn read(&self, name: &str, defaults: Option<&Value>) -> Result<Value> {
        let path = self.path(name)?;
        match read_optional(&self.span, &path)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| json_error(&self.span, &path, e)),
            None => match defaults {
                Some(defaults) => {
                    tracing::info!(parent: &self.span, name, "no stored settings, persisting defaults");
                    self.write(name, defaults)?;
                    Ok(defaults.clone())
                }
                None => Err(StoreError::NoSettings {
                    name: name.to_string(),
                }),
            },
        }
    }

    /// Replaces the document stored under `name`.
    pub fn write(&self, name: &str, values: &Value) -> Result<()> {
        let path = self.path(name)?;
        let bytes = serde_json::to_vec_pretty(values).map_err(|e| json_error(&self.span, &path, e))?;
        let tmp_path = self.dir.join(format!(".{}.tmp", name));
        write_atomic(&self.span, &path, &tmp_path, &bytes)?;
        tracing::debug!(parent: &self.span, name, "settings written");
        Ok(())
    }
}
