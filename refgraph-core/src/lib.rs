/*!
# Refgraph Core Engine

Adapter-based persistence for arbitrary, possibly cyclic, object graphs.

Domain types do not serialize themselves. Each one is paired with a *bean*:
a small serde type that copies the object's state out ([`Bean::fill`]) and
builds the object back ([`Bean::create_object`], [`Bean::populate`]). The
engine takes care of everything between the beans and a byte stream:

- reference ids, so shared objects are written once and read back as one
  instance ([`ids`], [`resolver`])
- frames, the groups of items that reference each other and must be read
  together ([`frames`])
- a class → bean mapping with fallback to the nearest registered ancestor
  ([`registry`]), swappable per format version ([`version`])
- the writing and reading sessions themselves ([`session`]) over a pluggable
  wire format ([`format`]), JSON by default

## Usage

```rust
use refgraph_core::{
    shared, Bean, BeanClass, BeanCore, BeanRegistry, Domain, DomainClass, JsonFormatConfig,
    MemoryBuffer, ObjectRef, PersistenceContext, PersistenceSession, ReferenceBean, Result,
    SessionConfig, Shared, VersionDriver, VersionRegistry,
};
use serde::{Deserialize, Serialize};

static NODE: DomainClass = DomainClass::new("Node", None);

#[derive(Default)]
struct Node {
    name: String,
    next: Option<Shared<Node>>,
}

impl Domain for Node {
    fn domain_class() -> &'static DomainClass {
        &NODE
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct NodeBean {
    #[serde(flatten)]
    core: BeanCore,
    name: String,
    next: ReferenceBean,
}

impl Bean for NodeBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        if let Some(node) = obj.downcast::<Node>() {
            let node = node.borrow();
            self.name = node.name.clone();
            let next = node.next.clone().map(ObjectRef::from);
            self.next = ReferenceBean::of_optional(next.as_ref(), ctx)?;
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Node::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let next = self.next.get_typed::<Node>(ctx)?;
        if let Some(node) = obj.downcast::<Node>() {
            let mut node = node.borrow_mut();
            node.name = self.name.clone();
            node.next = next;
        }
        Ok(())
    }
}

#[derive(Default)]
struct NodesV1;

impl VersionDriver for NodesV1 {
    fn version_id(&self) -> &str {
        "nodes/1"
    }

    fn register_beans(&self, registry: &mut BeanRegistry) {
        registry.register(&NODE, BeanClass::of::<NodeBean>());
    }
}

# fn main() -> Result<()> {
let mut versions = VersionRegistry::new();
versions.register_version::<NodesV1>();
let mut session =
    PersistenceSession::json(versions, SessionConfig::new("nodes/1"), JsonFormatConfig::plain())?;

// a -> b -> a
let a = shared(Node { name: "a".into(), next: None });
let b = shared(Node { name: "b".into(), next: Some(a.clone()) });
a.borrow_mut().next = Some(b.clone());

let buffer = MemoryBuffer::new();
session.start_writing(buffer.clone())?;
session.serialize(&ObjectRef::from(a.clone()))?;
session.end()?;

session.start_reading(std::io::Cursor::new(buffer.contents()))?;
let a2 = session.deserialize_typed::<Node>()?.expect("one item");
let b2 = a2.borrow().next.clone().expect("a points at b");
let back = b2.borrow().next.clone().expect("b points at a");
assert!(std::rc::Rc::ptr_eq(&a2, &back));
# Ok(())
# }
```
*/

pub mod annotations;
pub mod bean;
pub mod compression;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod frames;
pub mod ids;
pub mod object;
pub mod observability;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod version;

pub use annotations::{Annotations, AnnotationsBean};
pub use bean::{Bean, BeanClass, BeanCore, BeanKind, BeanObject, FactoryBean, Instantiated, ReferenceBean};
pub use compression::{CompressionAdapter, GzipCompressor, NoCompression};
pub use config::{JsonFormatConfig, SessionConfig, DEFAULT_ITEM_LABEL, DEFAULT_VERSION};
pub use context::PersistenceContext;
pub use error::{PersistError, Result};
pub use format::{BeanFormat, DocumentHeader, JsonDocument, JsonFormat, MemoryBuffer};
pub use frames::{Frame, FrameSet};
pub use ids::{RefId, RefIdGenerator};
pub use object::{shared, Domain, DomainClass, ObjectKey, ObjectRef, Shared};
pub use observability::{init_default_observability, init_observability};
#[cfg(feature = "metrics")]
pub use observability::{SessionMetrics, SessionTimer};
pub use registry::BeanRegistry;
pub use resolver::ReferenceResolver;
pub use session::{BeanEvent, BeanObserver, PersistenceSession, SessionState};
pub use version::{VersionDriver, VersionRegistry};

/// Persistence session over JSON documents.
pub type JsonSession = PersistenceSession<JsonFormat>;

#[cfg(test)]
mod test_support;
