/*!
Domain objects as seen by the engine.

Domain values live behind `Rc<RefCell<_>>` so that graphs may share and cycle.
The engine only handles them through [`ObjectRef`], a type-erased handle that
carries the object's [`DomainClass`] and compares by allocation identity.
*/

use crate::bean::BeanClass;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Shared, mutable domain value.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a value for use in an object graph.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Static descriptor of a domain type.
///
/// Descriptors form a single-inheritance chain through `parent`, which is what
/// the bean registry walks when a type has no adapter of its own. Names must be
/// unique within one registry; they are also the class names written into
/// documents.
///
/// ```rust
/// use refgraph_core::DomainClass;
///
/// static RESOURCE: DomainClass = DomainClass::new("Resource", None);
/// static TEXT_UNIT: DomainClass = DomainClass::new("TextUnit", Some(&RESOURCE));
///
/// assert!(TEXT_UNIT.is_a(&RESOURCE));
/// assert!(!RESOURCE.is_a(&TEXT_UNIT));
/// ```
pub struct DomainClass {
    name: &'static str,
    parent: Option<&'static DomainClass>,
    own_bean: Option<fn() -> BeanClass>,
}

impl DomainClass {
    pub const fn new(name: &'static str, parent: Option<&'static DomainClass>) -> Self {
        Self {
            name,
            parent,
            own_bean: None,
        }
    }

    /// Descriptor for a type that is its own adapter.
    pub const fn self_adapting(
        name: &'static str,
        parent: Option<&'static DomainClass>,
        bean: fn() -> BeanClass,
    ) -> Self {
        Self {
            name,
            parent,
            own_bean: Some(bean),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static DomainClass> {
        self.parent
    }

    /// Bean class of a self-adapting type.
    pub fn own_bean(&self) -> Option<BeanClass> {
        self.own_bean.map(|bean| bean())
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'static DomainClass> {
        std::iter::successors(self.parent, |class| class.parent)
    }

    /// True if `self` is `other` or descends from it.
    pub fn is_a(&self, other: &DomainClass) -> bool {
        self == other || self.ancestors().any(|ancestor| ancestor == other)
    }
}

impl PartialEq for DomainClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DomainClass {}

impl Hash for DomainClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for DomainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "DomainClass({} : {})", self.name, parent.name),
            None => write!(f, "DomainClass({})", self.name),
        }
    }
}

/// Rust types that take part in object graphs.
pub trait Domain: 'static {
    fn domain_class() -> &'static DomainClass;
}

/// Identity of an object: the address of its shared allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectKey(usize);

/// Type-erased handle to a shared domain object.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<dyn Any>,
    class: &'static DomainClass,
}

impl ObjectRef {
    /// Moves `value` into a fresh shared allocation.
    pub fn new<T: Domain>(value: T) -> Self {
        Self::from_shared(shared(value))
    }

    /// Handle to an existing shared value; the class comes from `T`.
    pub fn from_shared<T: Domain>(value: Shared<T>) -> Self {
        Self::with_class(value, T::domain_class())
    }

    /// Handle whose class differs from the Rust type's default, for types
    /// that back several domain classes of one hierarchy.
    pub fn with_class<T: 'static>(value: Shared<T>, class: &'static DomainClass) -> Self {
        Self {
            inner: value,
            class,
        }
    }

    pub fn class(&self) -> &'static DomainClass {
        self.class
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    /// The shared value, if it is a `T`.
    pub fn downcast<T: 'static>(&self) -> Option<Shared<T>> {
        Rc::clone(&self.inner).downcast::<RefCell<T>>().ok()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<RefCell<T>>()
    }

    /// True if both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.class.name, self.key().0)
    }
}

impl<T: Domain> From<Shared<T>> for ObjectRef {
    fn from(value: Shared<T>) -> Self {
        Self::from_shared(value)
    }
}
