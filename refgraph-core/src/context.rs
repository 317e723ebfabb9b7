/*!
The state beans see while they adapt objects.
*/

use crate::bean::{Bean, BeanClass};
use crate::ids::{RefId, RefIdGenerator};
use crate::object::{DomainClass, ObjectRef};
use crate::registry::BeanRegistry;
use crate::resolver::ReferenceResolver;
use crate::Result;
use tracing::trace;

/// Reference resolver and bean registry of one session.
///
/// Beans receive a `&mut PersistenceContext` in `fill`, `create_object` and
/// `populate`; everything they need for nested beans and references goes
/// through it.
pub struct PersistenceContext {
    resolver: ReferenceResolver,
    registry: BeanRegistry,
}

impl PersistenceContext {
    pub fn new(ids: RefIdGenerator) -> Self {
        Self {
            resolver: ReferenceResolver::new(ids),
            registry: BeanRegistry::new(),
        }
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ReferenceResolver {
        &mut self.resolver
    }

    pub fn registry(&self) -> &BeanRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BeanRegistry {
        &mut self.registry
    }

    pub fn ref_id_for_object(&self, obj: &ObjectRef) -> RefId {
        self.resolver.ref_id_for_object(obj)
    }

    pub fn set_ref_id_for_object(&mut self, obj: &ObjectRef, ref_id: RefId) -> Result<()> {
        self.resolver.set_ref_id_for_object(obj, ref_id)
    }

    pub fn object(&self, ref_id: RefId) -> Option<ObjectRef> {
        self.resolver.object(ref_id)
    }

    pub fn root_id(&self) -> RefId {
        self.resolver.root_id()
    }

    /// Records an edge from the item currently being adapted to `child`.
    ///
    /// Outside of a root (a bean used on its own) there is nothing to relate
    /// the edge to and it is dropped.
    pub fn reference_from_root(&mut self, child: RefId) -> Result<()> {
        let root = self.resolver.root_id();
        if root.is_none() {
            trace!(%child, "reference outside of a root, not recorded");
            return Ok(());
        }
        self.resolver.set_reference(root, child)
    }

    pub fn set_reference(&mut self, parent: RefId, child: RefId) -> Result<()> {
        self.resolver.set_reference(parent, child)
    }

    pub fn cache_bean(&mut self, obj: &ObjectRef, bean: Box<dyn Bean>) {
        self.resolver.cache_bean(obj, bean);
    }

    pub fn uncache_bean(&mut self, obj: &ObjectRef) -> Option<Box<dyn Bean>> {
        self.resolver.uncache_bean(obj)
    }

    pub fn is_serialized(&self, obj: &ObjectRef) -> bool {
        self.resolver.is_serialized(obj)
    }

    pub fn set_serialized(&mut self, obj: &ObjectRef) {
        self.resolver.set_serialized(obj);
    }

    /// Schedules `obj` to be written as its own item before the session ends.
    pub fn defer_write(&mut self, obj: &ObjectRef) {
        self.resolver.defer(obj);
    }

    pub fn bean_class(&self, class: &'static DomainClass) -> Option<BeanClass> {
        self.registry.get_bean_class(class)
    }

    /// A new bean with a fresh id.
    pub fn create_bean(&self, class: &BeanClass) -> Result<Box<dyn Bean>> {
        self.resolver.create_bean(class)
    }

    /// A new bean for objects of `class`, or `None` when the class has no
    /// adapter (already logged by the registry).
    pub fn create_bean_for(&self, class: &'static DomainClass) -> Result<Option<Box<dyn Bean>>> {
        match self.registry.get_bean_class(class) {
            Some(bean_class) => self.resolver.create_bean(&bean_class).map(Some),
            None => Ok(None),
        }
    }

    /// Anti-bean for the object of `class` already written under `ref_id`.
    pub fn create_anti_bean(
        &mut self,
        class: &'static DomainClass,
        ref_id: RefId,
    ) -> Result<Option<Box<dyn Bean>>> {
        match self.registry.get_bean_class(class) {
            Some(bean_class) => self.resolver.create_anti_bean(&bean_class, ref_id).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_proxy(&self, name: &str) -> Option<&dyn Bean> {
        self.registry.get_proxy(name)
    }
}
