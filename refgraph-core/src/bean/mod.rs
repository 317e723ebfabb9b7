/*!
The adapter ("bean") contract.

A bean mediates between one domain object and its wire representation. Each
concrete bean type supplies three steps: copying fields out of an object
([`Bean::fill`]), creating an empty object ([`Bean::create_object`]) and
copying fields back into it ([`Bean::populate`]). The shared algorithms built
on those steps, [`Bean::set`] and [`Bean::get`], handle reference-id binding
and the create/register/populate ordering that lets cycles resolve to the
instances that already exist.

Beans are plain serde types. The wire format only ever sees them as
`serde_json::Value` through [`BeanObject::encode`] and [`BeanClass::decode`].
*/

mod factory;
mod reference;

pub use factory::FactoryBean;
pub use reference::ReferenceBean;

use crate::context::PersistenceContext;
use crate::ids::RefId;
use crate::object::ObjectRef;
use crate::{PersistError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use tracing::trace;

/// State every bean carries: its reference id and the recursion guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanCore {
    #[serde(rename = "refId", default)]
    ref_id: RefId,
    #[serde(skip)]
    pub(crate) busy: bool,
}

impl BeanCore {
    pub fn new(ref_id: RefId) -> Self {
        Self {
            ref_id,
            busy: false,
        }
    }

    pub fn ref_id(&self) -> RefId {
        self.ref_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// Role of a bean type in reference bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanKind {
    /// Adapts one object and owns its reference id.
    Object,
    /// Points at an object written as its own item.
    Reference,
    /// Embeds a polymorphic object or points at it.
    Factory,
}

/// Outcome of the first resolution phase.
#[derive(Debug)]
pub enum Instantiated {
    /// A new, still empty object was created and registered.
    Created(ObjectRef),
    /// The reference id already resolved to an object.
    Existing(ObjectRef),
    /// The bean produced no object.
    Nothing,
}

/// Object-safe plumbing implemented for every serde bean type.
pub trait BeanObject {
    /// Encodes the bean into the neutral value model.
    fn encode(&self) -> Result<serde_json::Value>;

    fn clone_bean(&self) -> Box<dyn Bean>;

    fn as_any(&self) -> &dyn Any;

    /// Rust type name of the bean, for diagnostics.
    fn bean_name(&self) -> &'static str;
}

impl<T> BeanObject for T
where
    T: Bean + Serialize + Clone,
{
    fn encode(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn clone_bean(&self) -> Box<dyn Bean> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn bean_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Adapter between one domain object and its serialized form.
pub trait Bean: BeanObject + 'static {
    fn core(&self) -> &BeanCore;

    fn core_mut(&mut self) -> &mut BeanCore;

    fn kind(&self) -> BeanKind {
        BeanKind::Object
    }

    /// Copies the state of `obj` into this bean.
    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()>;

    /// Creates the object this bean stands for, without its field values.
    fn create_object(&mut self, ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>>;

    /// Copies this bean's state into `obj`, created earlier by `create_object`.
    fn populate(&mut self, _obj: &ObjectRef, _ctx: &mut PersistenceContext) -> Result<()> {
        Ok(())
    }

    fn ref_id(&self) -> RefId {
        self.core().ref_id
    }

    fn set_ref_id(&mut self, ref_id: RefId) {
        self.core_mut().ref_id = ref_id;
    }

    /// Adapts `obj`, binding it to this bean's reference id first.
    ///
    /// If `obj` is already tracked under another id, the bean adopts that id
    /// instead. Reference and factory beans skip the binding entirely.
    fn set(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        if self.kind() == BeanKind::Object {
            let bound = ctx.ref_id_for_object(obj);
            let own = self.ref_id();
            if !bound.is_none() && bound != own {
                trace!(bean = self.bean_name(), %own, %bound, "adopting existing reference id");
                self.set_ref_id(bound);
            } else {
                ctx.cache_bean(obj, self.clone_bean());
                ctx.set_ref_id_for_object(obj, own)?;
            }
        }
        self.fill(obj, ctx)
    }

    /// Materializes the object this bean stands for.
    fn get(&mut self, ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        match self.instantiate(ctx)? {
            Instantiated::Created(obj) => {
                self.populate(&obj, ctx)?;
                Ok(Some(obj))
            }
            Instantiated::Existing(obj) => Ok(Some(obj)),
            Instantiated::Nothing => Ok(None),
        }
    }

    /// First half of [`Bean::get`]: finds or creates the object and registers
    /// it under this bean's id, leaving its fields unpopulated.
    fn instantiate(&mut self, ctx: &mut PersistenceContext) -> Result<Instantiated> {
        let ref_id = self.ref_id();
        if self.core().busy {
            return Err(PersistError::ReentrantGet {
                bean: self.bean_name(),
                ref_id,
            });
        }

        if ref_id.is_anti() {
            return ctx
                .object(ref_id.target())
                .map(Instantiated::Existing)
                .ok_or_else(|| {
                    PersistError::broken_reference(format!(
                        "anti-bean {ref_id} points at an unresolved object"
                    ))
                });
        }

        if !ref_id.is_none() {
            if let Some(obj) = ctx.object(ref_id) {
                return Ok(Instantiated::Existing(obj));
            }
        }

        self.core_mut().busy = true;
        let created = self.create_object(ctx);
        self.core_mut().busy = false;

        let Some(obj) = created? else {
            return Ok(Instantiated::Nothing);
        };
        if !ref_id.is_none() && self.kind() == BeanKind::Object {
            ctx.set_ref_id_for_object(&obj, ref_id)?;
        }
        Ok(Instantiated::Created(obj))
    }
}

impl fmt::Debug for dyn Bean + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.bean_name(), self.ref_id())
    }
}

/// Runtime handle for a bean type: how to construct and decode it.
#[derive(Clone, Copy)]
pub struct BeanClass {
    name: &'static str,
    type_id: TypeId,
    kind: BeanKind,
    create: fn() -> Box<dyn Bean>,
    decode: fn(serde_json::Value) -> Result<Box<dyn Bean>>,
}

impl BeanClass {
    pub fn of<B>() -> Self
    where
        B: Bean + Default + DeserializeOwned,
    {
        Self {
            name: std::any::type_name::<B>(),
            type_id: TypeId::of::<B>(),
            kind: B::default().kind(),
            create: create_bean::<B>,
            decode: decode_bean::<B>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> BeanKind {
        self.kind
    }

    pub fn is<B: Bean>(&self) -> bool {
        self.type_id == TypeId::of::<B>()
    }

    /// A new bean with reference id zero.
    pub fn instantiate(&self) -> Box<dyn Bean> {
        (self.create)()
    }

    pub fn decode(&self, value: serde_json::Value) -> Result<Box<dyn Bean>> {
        (self.decode)(value)
    }
}

impl PartialEq for BeanClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for BeanClass {}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanClass({})", self.name)
    }
}

fn create_bean<B: Bean + Default>() -> Box<dyn Bean> {
    Box::new(B::default())
}

fn decode_bean<B: Bean + DeserializeOwned>(value: serde_json::Value) -> Result<Box<dyn Bean>> {
    Ok(Box::new(serde_json::from_value::<B>(value)?))
}
