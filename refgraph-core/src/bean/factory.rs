use super::{Bean, BeanCore, BeanKind, BeanObject};
use crate::context::PersistenceContext;
use crate::ids::RefId;
use crate::object::{Domain, ObjectRef, Shared};
use crate::{PersistError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Embeds an object of any registered class, or points at it.
///
/// The first time an object passes through a factory bean its full bean is
/// embedded together with the object's class name, and the object is marked
/// serialized so a later top-level write of it becomes an anti-bean. Objects
/// that already have a reference id are stored as a reference instead.
///
/// When the object's class has no bean of its own and borrows an ancestor's,
/// that ancestor is recorded as `beanClass` and decodes the content, so the
/// object's class does not have to be known by name to read it back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryBean {
    #[serde(flatten)]
    core: BeanCore,
    #[serde(rename = "className")]
    class_name: String,
    #[serde(rename = "beanClass", skip_serializing_if = "Option::is_none")]
    bean_class: Option<String>,
    reference: RefId,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
}

impl FactoryBean {
    pub fn of(obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<Self> {
        let mut bean = Self::default();
        bean.set(obj, ctx)?;
        Ok(bean)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Class whose bean encoded the content, when it is not the object's own.
    pub fn bean_class(&self) -> Option<&str> {
        self.bean_class.as_deref()
    }

    pub fn reference(&self) -> RefId {
        self.reference
    }

    /// The embedded bean, if the object was written inline.
    pub fn content(&self) -> Option<&Value> {
        self.content.as_ref()
    }

    pub fn get_typed<T: Domain>(&mut self, ctx: &mut PersistenceContext) -> Result<Option<Shared<T>>> {
        match self.get(ctx)? {
            Some(obj) => obj
                .downcast::<T>()
                .map(Some)
                .ok_or(PersistError::TypeMismatch {
                    expected: T::domain_class().name(),
                    actual: obj.class().name(),
                }),
            None => Ok(None),
        }
    }
}

impl Bean for FactoryBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn kind(&self) -> BeanKind {
        BeanKind::Factory
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        self.class_name = obj.class().name().to_string();
        self.bean_class = None;
        self.content = None;

        let bound = ctx.ref_id_for_object(obj);
        if !bound.is_none() {
            trace!(class = obj.class().name(), reference = %bound, "factory bean stores a reference");
            self.reference = bound;
            return ctx.reference_from_root(bound);
        }

        self.reference = RefId::NONE;
        let Some(mut bean) = ctx.create_bean_for(obj.class())? else {
            return Ok(());
        };
        self.bean_class = ctx
            .registry()
            .get_bean_owner(obj.class())
            .filter(|owner| *owner != obj.class())
            .map(|owner| owner.name().to_string());
        bean.set(obj, ctx)?;
        self.content = Some(bean.encode()?);
        ctx.set_serialized(obj);
        Ok(())
    }

    fn create_object(&mut self, ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        if !self.reference.is_none() {
            return ctx.object(self.reference).map(Some).ok_or_else(|| {
                PersistError::broken_reference(format!(
                    "{} {} was not read before it was referenced",
                    self.class_name, self.reference
                ))
            });
        }

        let Some(content) = self.content.clone() else {
            return Ok(None);
        };
        let name = self.bean_class.as_deref().unwrap_or(&self.class_name);
        let bean_class = ctx
            .registry()
            .get_bean_class_by_name(name)
            .ok_or_else(|| PersistError::UnregisteredClass(name.to_string()))?;
        let mut bean = bean_class.decode(content)?;
        bean.get(ctx)
    }
}
