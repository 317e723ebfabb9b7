//! Session and wire-format configuration
//!
//! Both structures are plain serde types so they can be loaded from whatever
//! settings file an application already has.

use crate::{PersistError, Result};
use serde::{Deserialize, Serialize};

/// Version id used when nothing else was configured.
pub const DEFAULT_VERSION: &str = "refgraph/1.0";

/// Prefix of automatically generated item labels (`item1`, `item2`, ...).
pub const DEFAULT_ITEM_LABEL: &str = "item";

/// Settings of one persistence session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Version activated at construction and after every `end()`
    pub default_version: String,
    /// Prefix for generated item labels
    pub item_label: String,
    /// Domain class name recorded in the header as the document's item class
    pub item_class: Option<String>,
    /// Free-text description recorded in the header
    pub description: Option<String>,
}

impl SessionConfig {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
            ..Self::default()
        }
    }

    pub fn with_item_label(mut self, label: impl Into<String>) -> Self {
        self.item_label = label.into();
        self
    }

    pub fn with_item_class(mut self, class: impl Into<String>) -> Self {
        self.item_class = Some(class.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_version.trim().is_empty() {
            return Err(PersistError::validation("version id cannot be empty"));
        }
        if self.item_label.trim().is_empty() {
            return Err(PersistError::validation("item label cannot be empty"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_version: DEFAULT_VERSION.to_string(),
            item_label: DEFAULT_ITEM_LABEL.to_string(),
            item_class: None,
            description: None,
        }
    }
}

/// Settings of the JSON document format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonFormatConfig {
    /// Gzip the finished document
    pub compress: bool,
    /// Gzip level, 0-9
    pub compression_level: u32,
    /// Indent the JSON output
    pub pretty: bool,
    /// Check the header's body hash when reading
    pub verify_integrity: bool,
}

impl JsonFormatConfig {
    /// Indented, uncompressed JSON.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Compact JSON in a gzip envelope.
    pub fn compressed() -> Self {
        Self {
            compress: true,
            pretty: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(PersistError::validation(format!(
                "compression level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

impl Default for JsonFormatConfig {
    fn default() -> Self {
        Self {
            compress: false,
            compression_level: 6,
            pretty: true,
            verify_integrity: true,
        }
    }
}
