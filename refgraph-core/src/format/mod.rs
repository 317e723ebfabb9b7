/*!
Wire formats.

A [`BeanFormat`] is the pair of stream primitives a session drives: an
envelope opened and closed once per document and one call per item in
between. The engine never looks at the bytes itself.
*/

mod header;
pub mod json;

pub use header::DocumentHeader;
pub use json::{JsonDocument, JsonFormat};

use crate::bean::{Bean, BeanClass};
use crate::Result;
use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Stream primitives of a concrete document syntax.
pub trait BeanFormat {
    fn mime_type(&self) -> &str;

    /// Opens a document on `output`.
    fn start_writing(&mut self, output: Box<dyn Write>) -> Result<()>;

    /// Appends one item under `label`. `class` names the domain class whose
    /// bean encoded it and is handed back by [`BeanFormat::next_class`].
    fn write_bean(&mut self, bean: &dyn Bean, class: &str, label: &str) -> Result<()>;

    /// Completes the document. `header` carries everything the session knows;
    /// the format adds its own fields before writing it.
    fn end_writing(&mut self, header: DocumentHeader) -> Result<()>;

    /// Opens a document and returns its header.
    fn start_reading(&mut self, input: Box<dyn Read>) -> Result<DocumentHeader>;

    /// Class recorded for the next item, if any, without consuming it.
    fn next_class(&self) -> Option<&str>;

    /// Next item decoded with `class`, or `None` past the last item.
    ///
    /// `label` is the expected prefix of the item's label.
    fn read_bean(&mut self, class: &BeanClass, label: &str) -> Result<Option<Box<dyn Bean>>>;

    fn end_reading(&mut self) -> Result<()>;

    fn write_bean_to_string(&self, bean: &dyn Bean) -> Result<String>;

    fn read_bean_from_string(&self, content: &str, class: &BeanClass) -> Result<Box<dyn Bean>>;
}

/// In-memory output that stays readable after the session has consumed it.
///
/// Clones share the same bytes.
///
/// ```rust
/// use refgraph_core::MemoryBuffer;
/// use std::io::Write;
///
/// let buffer = MemoryBuffer::new();
/// let mut writer = buffer.clone();
/// writer.write_all(b"{}").unwrap();
/// assert_eq!(buffer.contents(), b"{}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    /// The contents as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.borrow().is_empty()
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
