/*!
Mapping from domain classes to bean classes.

Registrations are kept in insertion order. A class without a registration of
its own falls back to the most recently registered ancestor, so one generic
bean can serve a whole hierarchy while specific subclasses get precise ones.
*/

use crate::bean::{Bean, BeanClass};
use crate::ids::RefId;
use crate::object::DomainClass;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

struct Registration {
    class: &'static DomainClass,
    bean: BeanClass,
    block_fallback_warning: bool,
}

/// Ordered domain-class → bean-class table with cached proxies.
#[derive(Default)]
pub struct BeanRegistry {
    entries: Vec<Registration>,
    proxies: HashMap<&'static str, Box<dyn Bean>>,
    classes: HashMap<&'static str, &'static DomainClass>,
    reported_fallbacks: RefCell<HashSet<&'static str>>,
    reported_missing: RefCell<HashSet<(&'static str, String)>>,
    warnings: Cell<usize>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every registration, proxy and logged warning.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.proxies.clear();
        self.classes.clear();
        self.reported_fallbacks.borrow_mut().clear();
        self.reported_missing.borrow_mut().clear();
    }

    /// Maps `class` to `bean`, replacing and re-ordering any earlier entry.
    pub fn register(&mut self, class: &'static DomainClass, bean: BeanClass) {
        self.register_bean(class, bean, false);
    }

    /// Maps `class` to `bean`. With `block_fallback_warning`, subclasses that
    /// fall back to this entry do so silently.
    pub fn register_bean(
        &mut self,
        class: &'static DomainClass,
        bean: BeanClass,
        block_fallback_warning: bool,
    ) {
        self.entries.retain(|entry| entry.class != class);
        self.entries.push(Registration {
            class,
            bean,
            block_fallback_warning,
        });
        self.declare_class(class);

        let mut proxy = bean.instantiate();
        proxy.set_ref_id(RefId::NONE);
        self.proxies.insert(class.name(), proxy);
        debug!(class = class.name(), bean = bean.name(), "bean registered");
    }

    /// Makes `class` and its ancestors known by name without registering a bean.
    pub fn declare_class(&mut self, class: &'static DomainClass) {
        self.classes.insert(class.name(), class);
        for ancestor in class.ancestors() {
            self.classes.entry(ancestor.name()).or_insert(ancestor);
        }
    }

    /// Bean class for `class`: exact entry, then the class's own adapter, then
    /// the nearest registered ancestor, scanning newest entries first.
    ///
    /// Returns `None` (logged once per class) when nothing applies.
    pub fn get_bean_class(&self, class: &'static DomainClass) -> Option<BeanClass> {
        self.lookup(class).map(|(_, bean)| bean)
    }

    /// The class whose registration serves `class`: `class` itself for an
    /// exact entry or its own adapter, otherwise the ancestor it falls back to.
    ///
    /// Registered classes are known by name, so a fallback owner can always be
    /// found again with [`BeanRegistry::get_class`] even when `class` cannot.
    pub fn get_bean_owner(&self, class: &'static DomainClass) -> Option<&'static DomainClass> {
        self.lookup(class).map(|(owner, _)| owner)
    }

    fn lookup(&self, class: &'static DomainClass) -> Option<(&'static DomainClass, BeanClass)> {
        if let Some(entry) = self.entries.iter().find(|entry| entry.class == class) {
            return Some((class, entry.bean));
        }

        if let Some(own) = class.own_bean() {
            return Some((class, own));
        }

        let fallback = self
            .entries
            .iter()
            .rev()
            .find(|entry| class.is_a(entry.class));
        match fallback {
            Some(entry) => {
                if !entry.block_fallback_warning
                    && self.reported_fallbacks.borrow_mut().insert(class.name())
                {
                    self.warnings.set(self.warnings.get() + 1);
                    warn!(
                        class = class.name(),
                        fallback = entry.class.name(),
                        bean = entry.bean.name(),
                        "no bean registered for class, using the bean of an ancestor"
                    );
                }
                Some((entry.class, entry.bean))
            }
            None => {
                self.report_missing(class.name(), "no bean registered for class");
                None
            }
        }
    }

    /// Bean class for a domain class known by name.
    pub fn get_bean_class_by_name(&self, name: &str) -> Option<BeanClass> {
        match self.get_class(name) {
            Some(class) => self.get_bean_class(class),
            None => {
                self.report_missing(name, "unknown class name");
                None
            }
        }
    }

    pub fn get_class(&self, name: &str) -> Option<&'static DomainClass> {
        self.classes.get(name).copied()
    }

    /// Reverse lookup: the newest domain class registered with `bean`.
    pub fn get_object_class(&self, bean: &BeanClass) -> Option<&'static DomainClass> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.bean == *bean)
            .map(|entry| entry.class)
    }

    /// The cached zero-id bean for a registered class name.
    pub fn get_proxy(&self, name: &str) -> Option<&dyn Bean> {
        let proxy = self.proxies.get(name).map(|proxy| &**proxy);
        if proxy.is_none() {
            self.report_missing(name, "no proxy for class");
        }
        proxy
    }

    pub fn get_proxy_for(&self, class: &DomainClass) -> Option<&dyn Bean> {
        self.get_proxy(class.name())
    }

    /// Registered classes, oldest first.
    pub fn classes(&self) -> impl Iterator<Item = &'static DomainClass> + '_ {
        self.entries.iter().map(|entry| entry.class)
    }

    /// Number of once-per-class warnings emitted so far.
    pub(crate) fn warning_count(&self) -> usize {
        self.warnings.get()
    }

    fn report_missing(&self, name: &str, message: &'static str) {
        if self
            .reported_missing
            .borrow_mut()
            .insert((message, name.to_string()))
        {
            self.warnings.set(self.warnings.get() + 1);
            warn!(class = name, "{message}");
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
