/*!
Document annotations.

An annotation is an object attached to a whole document instead of one item,
at most one per domain class. A session carries its annotations into the
header of every document it writes and replaces them with the header's when it
opens a document for reading.

Each annotation goes through the bean registered for its class, embedded with
a [`FactoryBean`], so annotation classes need a bean in the active version.
Annotations are embedded on their own: references out of them are not
followed.
*/

use crate::bean::{Bean, FactoryBean};
use crate::context::PersistenceContext;
use crate::object::{Domain, DomainClass, ObjectRef, Shared};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Annotations keyed by their domain class, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    entries: Vec<ObjectRef>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `annotation`, returning the one of the same class it replaces.
    pub fn set(&mut self, annotation: ObjectRef) -> Option<ObjectRef> {
        let class = annotation.class();
        match self.entries.iter_mut().find(|entry| entry.class() == class) {
            Some(entry) => Some(std::mem::replace(entry, annotation)),
            None => {
                self.entries.push(annotation);
                None
            }
        }
    }

    pub fn get(&self, class: &DomainClass) -> Option<&ObjectRef> {
        self.entries.iter().find(|entry| entry.class() == class)
    }

    /// The annotation of `T`'s class, as a `T`.
    pub fn get_typed<T: Domain>(&self) -> Option<Shared<T>> {
        self.get(T::domain_class())
            .and_then(|annotation| annotation.downcast::<T>())
    }

    pub fn remove(&mut self, class: &DomainClass) -> Option<ObjectRef> {
        let index = self.entries.iter().position(|entry| entry.class() == class)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRef> {
        self.entries.iter()
    }
}

/// Wire form of [`Annotations`]: one factory bean per annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsBean {
    items: Vec<FactoryBean>,
}

impl AnnotationsBean {
    /// Embeds every annotation. The caller provides caches with no objects
    /// bound, otherwise already tracked annotations become references.
    pub fn of(annotations: &Annotations, ctx: &mut PersistenceContext) -> Result<Self> {
        let items = annotations
            .iter()
            .map(|annotation| FactoryBean::of(annotation, ctx))
            .collect::<Result<_>>()?;
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rebuilds the annotations. Entries whose class had no bean when they
    /// were written carry no content and are dropped.
    pub fn restore(&mut self, ctx: &mut PersistenceContext) -> Result<Annotations> {
        let mut annotations = Annotations::new();
        for item in &mut self.items {
            match item.get(ctx)? {
                Some(annotation) => {
                    annotations.set(annotation);
                }
                None => warn!(class = item.class_name(), "annotation without content dropped"),
            }
        }
        Ok(annotations)
    }
}
