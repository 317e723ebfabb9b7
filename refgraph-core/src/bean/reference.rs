use super::{Bean, BeanCore, BeanKind};
use crate::context::PersistenceContext;
use crate::ids::RefId;
use crate::object::{Domain, ObjectRef, Shared};
use crate::{PersistError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Points at an object that is written as an item of its own.
///
/// Filling a reference bean for an object nobody has adapted yet creates that
/// object's bean, binds its id and queues the object so the session writes it
/// before the document is closed. Reading resolves the stored id against the
/// objects already materialized, which the frame algorithm guarantees for
/// references that cross items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceBean {
    #[serde(flatten)]
    core: BeanCore,
    #[serde(rename = "className")]
    class_name: String,
    reference: RefId,
}

impl ReferenceBean {
    /// A reference bean filled from `obj`.
    pub fn of(obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<Self> {
        let mut bean = Self::default();
        bean.set(obj, ctx)?;
        Ok(bean)
    }

    /// A reference bean for an optional object; `None` stays unset.
    pub fn of_optional(obj: Option<&ObjectRef>, ctx: &mut PersistenceContext) -> Result<Self> {
        match obj {
            Some(obj) => Self::of(obj, ctx),
            None => Ok(Self::default()),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn reference(&self) -> RefId {
        self.reference
    }

    pub fn is_set(&self) -> bool {
        !self.reference.is_none()
    }

    /// Resolves the reference as a `T`.
    ///
    /// # Errors
    /// * `PersistError::TypeMismatch` - If the referenced object is not a `T`
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

impl Bean for ReferenceBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn kind(&self) -> BeanKind {
        BeanKind::Reference
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        self.class_name = obj.class().name().to_string();

        let mut ref_id = ctx.ref_id_for_object(obj);
        if ref_id.is_none() {
            let Some(bean) = ctx.create_bean_for(obj.class())? else {
                self.reference = RefId::NONE;
                return Ok(());
            };
            ref_id = bean.ref_id();
            ctx.cache_bean(obj, bean);
            ctx.set_ref_id_for_object(obj, ref_id)?;
            ctx.defer_write(obj);
            debug!(class = obj.class().name(), %ref_id, "referenced object queued for writing");
        }

        self.reference = ref_id;
        ctx.reference_from_root(ref_id)
    }

    fn create_object(&mut self, ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        if self.reference.is_none() {
            return Ok(None);
        }
        ctx.object(self.reference).map(Some).ok_or_else(|| {
            PersistError::broken_reference(format!(
                "{} {} was not read before it was referenced",
                self.class_name, self.reference
            ))
        })
    }
}
