/*!
JSON bean documents.

A document is a single object with a header and a body:

```json
{
  "header": {
    "version": "refgraph/1.0",
    "description": "",
    "itemClass": "Node",
    "mimeType": "application/json",
    "frames": [[1, 2]],
    "created": "2024-05-01T10:00:00Z",
    "documentId": "1d4c...",
    "bodyHash": "9f2a..."
  },
  "body": {
    "item1": { "@class": "Node", "refId": 1, "name": "root", "children": [ ... ] },
    "item2": { "@class": "Node", "refId": 2, "name": "a", "children": [ ... ] }
  }
}
```

Each item carries the domain class it was written as under `@class`, so a
body may mix classes (objects reached through references are appended as
items of their own). Items without it are decoded with the bean the reader
asks for.

Frames are only known once every item has been written, so the body is
buffered and the whole document goes out at `end_writing`. Body entries keep
their write order on both sides.
*/

use super::{BeanFormat, DocumentHeader};
use crate::bean::{Bean, BeanClass, BeanObject};
use crate::compression::{self, CompressionAdapter, GzipCompressor};
use crate::config::JsonFormatConfig;
use crate::{PersistError, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{Read, Write};
use tracing::debug;

pub const MIME_TYPE: &str = "application/json";

/// Item key holding the domain class name.
pub const CLASS_KEY: &str = "@class";

/// A whole document, as parsed from or written to a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    pub header: DocumentHeader,
    #[serde(with = "ordered_body", default)]
    pub body: Vec<(String, Value)>,
}

impl JsonDocument {
    /// Parses a plain or gzipped document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let plain = compression::detect(bytes).decompress(bytes)?;
        let document: JsonDocument = serde_json::from_slice(&plain)
            .map_err(|e| PersistError::invalid_format(format!("not a bean document: {e}")))?;
        Ok(document)
    }

    /// Compact serialization of the body, the input of the body hash.
    pub fn canonical_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&OrderedBody(&self.body))?)
    }

    /// Checks the body against the header's hash.
    pub fn verify(&self) -> Result<()> {
        self.header.verify_integrity(&self.canonical_body()?)
    }

    /// Item labels in document order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.body.iter().map(|(label, _)| label.as_str())
    }
}

struct OrderedBody<'a>(&'a [(String, Value)]);

impl Serialize for OrderedBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ordered_body::serialize(self.0, serializer)
    }
}

/// Body as an ordered list of `(label, bean)` pairs on the Rust side and a
/// JSON object on the wire.
mod ordered_body {
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use serde_json::Value;
    use std::fmt;

    pub fn serialize<S: Serializer>(
        body: &[(String, Value)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(body.len()))?;
        for (label, bean) in body {
            map.serialize_entry(label, bean)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, Value)>, D::Error> {
        struct BodyVisitor;

        impl<'de> Visitor<'de> for BodyVisitor {
            type Value = Vec<(String, Value)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of labelled items")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(item) = access.next_entry::<String, Value>()? {
                    items.push(item);
                }
                Ok(items)
            }
        }

        deserializer.deserialize_map(BodyVisitor)
    }
}

/// [`BeanFormat`] producing [`JsonDocument`]s.
#[derive(Default)]
pub struct JsonFormat {
    config: JsonFormatConfig,
    output: Option<Box<dyn Write>>,
    body: Vec<(String, Value)>,
    items: VecDeque<(String, Value)>,
}

impl JsonFormat {
    pub fn new(config: JsonFormatConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            output: None,
            body: Vec::new(),
            items: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &JsonFormatConfig {
        &self.config
    }

    fn to_json(&self, value: &impl Serialize) -> Result<Vec<u8>> {
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }
}

impl BeanFormat for JsonFormat {
    fn mime_type(&self) -> &str {
        MIME_TYPE
    }

    fn start_writing(&mut self, output: Box<dyn Write>) -> Result<()> {
        self.output = Some(output);
        self.body.clear();
        Ok(())
    }

    fn write_bean(&mut self, bean: &dyn Bean, class: &str, label: &str) -> Result<()> {
        if self.output.is_none() {
            return Err(PersistError::invalid_state("no document is open for writing"));
        }
        let mut value = bean.encode()?;
        if let Value::Object(fields) = &mut value {
            fields.insert(CLASS_KEY.to_string(), Value::String(class.to_string()));
        }
        self.body.push((label.to_string(), value));
        Ok(())
    }

    fn end_writing(&mut self, header: DocumentHeader) -> Result<()> {
        let mut output = self
            .output
            .take()
            .ok_or_else(|| PersistError::invalid_state("no document is open for writing"))?;

        let mut document = JsonDocument {
            header: header.with_mime_type(MIME_TYPE),
            body: std::mem::take(&mut self.body),
        };
        let canonical = document.canonical_body()?;
        document.header = document.header.with_body_hash(&canonical);

        let mut bytes = self.to_json(&document)?;
        if self.config.compress {
            bytes = GzipCompressor::with_level(self.config.compression_level).compress(&bytes)?;
        }
        output.write_all(&bytes)?;
        output.flush()?;

        debug!(
            items = document.body.len(),
            frames = document.header.frames.len(),
            bytes = bytes.len(),
            compressed = self.config.compress,
            "JSON document written"
        );
        Ok(())
    }

    fn start_reading(&mut self, mut input: Box<dyn Read>) -> Result<DocumentHeader> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let document = JsonDocument::from_slice(&bytes)?;
        if self.config.verify_integrity {
            document.verify()?;
        }
        document.header.validate()?;

        debug!(
            version = %document.header.version,
            items = document.body.len(),
            frames = document.header.frames.len(),
            "JSON document opened"
        );
        self.items = document.body.into();
        Ok(document.header)
    }

    fn next_class(&self) -> Option<&str> {
        self.items
            .front()
            .and_then(|(_, value)| value.get(CLASS_KEY))
            .and_then(Value::as_str)
    }

    fn read_bean(&mut self, class: &BeanClass, label: &str) -> Result<Option<Box<dyn Bean>>> {
        let Some((name, mut value)) = self.items.pop_front() else {
            return Ok(None);
        };
        if !label.is_empty() && !name.starts_with(label) {
            return Err(PersistError::invalid_format(format!(
                "item label should start with \"{label}\", but was \"{name}\""
            )));
        }
        if let Value::Object(fields) = &mut value {
            fields.remove(CLASS_KEY);
        }
        class.decode(value).map(Some)
    }

    fn end_reading(&mut self) -> Result<()> {
        self.items.clear();
        Ok(())
    }

    fn write_bean_to_string(&self, bean: &dyn Bean) -> Result<String> {
        let value = bean.encode()?;
        let text = if self.config.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn read_bean_from_string(&self, content: &str, class: &BeanClass) -> Result<Box<dyn Bean>> {
        let value: Value = serde_json::from_str(content)?;
        class.decode(value)
    }
}
