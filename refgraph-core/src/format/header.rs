/*!
Document header: what a reader must know before the first item.
*/

use crate::ids::RefId;
use crate::{PersistError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Header of a bean document.
///
/// The session fills in the version, description, item class and frames;
/// the format adds its MIME type and the body hash when the document is
/// finished. Fields a foreign writer left out take their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentHeader {
    /// Version id of the bean mapping the body was written with
    pub version: String,

    pub description: String,

    /// Name of the domain class of the document's items
    pub item_class: String,

    pub mime_type: String,

    /// Groups of root ids that must be resolved together
    pub frames: Vec<Vec<RefId>>,

    pub created: DateTime<Utc>,

    /// Unique id of this document
    pub document_id: String,

    /// SHA-256 of the canonical body, hex encoded; empty when not computed
    pub body_hash: String,

    /// Encoded document annotations, absent when there are none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

impl DocumentHeader {
    pub fn new<S: Into<String>>(version: S) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_item_class<S: Into<String>>(mut self, item_class: S) -> Self {
        self.item_class = item_class.into();
        self
    }

    pub fn with_frames(mut self, frames: Vec<Vec<RefId>>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_annotations(mut self, annotations: Option<Value>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Records the hash of `body`.
    pub fn with_body_hash(mut self, body: &[u8]) -> Self {
        self.body_hash = Self::compute_hash(body);
        self
    }

    /// SHA-256 of `data` as lowercase hex.
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Checks `body` against the recorded hash. Headers without a hash pass.
    ///
    /// # Errors
    /// * `PersistError::IntegrityCheckFailed` - If the hashes differ
    pub fn verify_integrity(&self, body: &[u8]) -> Result<()> {
        if self.body_hash.is_empty() {
            return Ok(());
        }
        let actual = Self::compute_hash(body);
        if actual == self.body_hash {
            Ok(())
        } else {
            Err(PersistError::IntegrityCheckFailed {
                expected: self.body_hash.clone(),
                actual,
            })
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(PersistError::invalid_format("header has no version"));
        }
        if let Some(frame) = self
            .frames
            .iter()
            .find(|frame| frame.iter().any(RefId::is_none))
        {
            return Err(PersistError::invalid_format(format!(
                "frame {frame:?} contains reference id 0"
            )));
        }
        Ok(())
    }

    /// Number of items that take part in a frame.
    pub fn framed_roots(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }
}

impl Default for DocumentHeader {
    fn default() -> Self {
        Self {
            version: String::new(),
            description: String::new(),
            item_class: String::new(),
            mime_type: String::new(),
            frames: Vec::new(),
            created: Utc::now(),
            document_id: Uuid::new_v4().to_string(),
            body_hash: String::new(),
            annotations: None,
        }
    }
}
