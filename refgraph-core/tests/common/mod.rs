/*!
Shared fixtures for the integration tests: a few small domain models with
their beans, and the version drivers that register them.
*/

#![allow(dead_code)]

use refgraph_core::{
    shared, Bean, BeanClass, BeanCore, BeanRegistry, Domain, DomainClass, FactoryBean,
    JsonFormatConfig, JsonSession, ObjectRef, PersistenceContext, PersistenceSession,
    ReferenceBean, Result, SessionConfig, Shared, VersionDriver, VersionRegistry,
};
use serde::{Deserialize, Serialize};
use std::sync::Once;

pub const GRAPH_V1: &str = "graph/1";
pub const GRAPH_V2: &str = "graph/2";

static INIT: Once = Once::new();

/// Installs the default subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = refgraph_core::init_default_observability();
    });
}

pub static NODE: DomainClass = DomainClass::new("Node", None);
pub static LINK: DomainClass = DomainClass::new("Link", None);
pub static ANIMAL: DomainClass = DomainClass::new("Animal", None);
pub static DOG: DomainClass = DomainClass::new("Dog", Some(&ANIMAL));
pub static PUPPY: DomainClass = DomainClass::new("Puppy", Some(&DOG));
pub static SHELF: DomainClass = DomainClass::new("Shelf", None);
pub static OWNER: DomainClass = DomainClass::new("Owner", None);

/// Node of a graph whose children are written as items of their own.
#[derive(Debug, Default)]
pub struct Node {
    pub id: u32,
    pub children: Vec<Shared<Node>>,
}

impl Domain for Node {
    fn domain_class() -> &'static DomainClass {
        &NODE
    }
}

pub fn node(id: u32) -> Shared<Node> {
    shared(Node {
        id,
        children: Vec::new(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeBean {
    #[serde(flatten)]
    core: BeanCore,
    id: u32,
    children: Vec<ReferenceBean>,
}

impl Bean for NodeBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let Some(node) = obj.downcast::<Node>() else {
            return Ok(());
        };
        let (id, children) = {
            let node = node.borrow();
            let children: Vec<ObjectRef> =
                node.children.iter().cloned().map(ObjectRef::from).collect();
            (node.id, children)
        };
        self.id = id;
        self.children = children
            .iter()
            .map(|child| ReferenceBean::of(child, ctx))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Node::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            if let Some(child) = child.get_typed::<Node>(ctx)? {
                children.push(child);
            }
        }
        if let Some(node) = obj.downcast::<Node>() {
            let mut node = node.borrow_mut();
            node.id = self.id;
            node.children = children;
        }
        Ok(())
    }
}

/// Singly linked list element.
#[derive(Debug, Default)]
pub struct Link {
    pub name: String,
    pub next: Option<Shared<Link>>,
}

impl Domain for Link {
    fn domain_class() -> &'static DomainClass {
        &LINK
    }
}

pub fn link(name: &str) -> Shared<Link> {
    shared(Link {
        name: name.to_string(),
        next: None,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkBean {
    #[serde(flatten)]
    core: BeanCore,
    name: String,
    next: ReferenceBean,
}

impl Bean for LinkBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        if let Some(link) = obj.downcast::<Link>() {
            let (name, next) = {
                let link = link.borrow();
                (link.name.clone(), link.next.clone().map(ObjectRef::from))
            };
            self.name = name;
            self.next = ReferenceBean::of_optional(next.as_ref(), ctx)?;
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Link::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let next = self.next.get_typed::<Link>(ctx)?;
        if let Some(link) = obj.downcast::<Link>() {
            let mut link = link.borrow_mut();
            link.name = self.name.clone();
            link.next = next;
        }
        Ok(())
    }
}

/// One Rust type behind the Animal > Dog > Puppy hierarchy.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Animal {
    pub name: String,
    pub legs: u8,
}

impl Domain for Animal {
    fn domain_class() -> &'static DomainClass {
        &ANIMAL
    }
}

pub fn animal(class: &'static DomainClass, name: &str, legs: u8) -> ObjectRef {
    ObjectRef::with_class(
        shared(Animal {
            name: name.to_string(),
            legs,
        }),
        class,
    )
}

/// Records the animal's class so a `Dog` comes back tagged as a `Dog`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimalBean {
    #[serde(flatten)]
    core: BeanCore,
    class: String,
    name: String,
    legs: u8,
}

impl Bean for AnimalBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, _ctx: &mut PersistenceContext) -> Result<()> {
        if let Some(animal) = obj.downcast::<Animal>() {
            let animal = animal.borrow();
            self.class = obj.class().name().to_string();
            self.name = animal.name.clone();
            self.legs = animal.legs;
        }
        Ok(())
    }

    fn create_object(&mut self, ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        // Classes the reader does not know by name stay plain animals
        let class = ctx
            .registry()
            .get_class(&self.class)
            .filter(|class| class.is_a(&ANIMAL))
            .unwrap_or(&ANIMAL);
        Ok(Some(animal(class, &self.name, self.legs)))
    }
}

/// Holds animals of any class, embedded through factory beans.
#[derive(Debug, Default)]
pub struct Shelf {
    pub label: String,
    pub items: Vec<ObjectRef>,
}

impl Domain for Shelf {
    fn domain_class() -> &'static DomainClass {
        &SHELF
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfBean {
    #[serde(flatten)]
    core: BeanCore,
    label: String,
    items: Vec<FactoryBean>,
}

impl Bean for ShelfBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let Some(shelf) = obj.downcast::<Shelf>() else {
            return Ok(());
        };
        let (label, items) = {
            let shelf = shelf.borrow();
            (shelf.label.clone(), shelf.items.clone())
        };
        self.label = label;
        self.items = items
            .iter()
            .map(|item| FactoryBean::of(item, ctx))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Shelf::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in &mut self.items {
            if let Some(item) = item.get(ctx)? {
                items.push(item);
            }
        }
        if let Some(shelf) = obj.downcast::<Shelf>() {
            let mut shelf = shelf.borrow_mut();
            shelf.label = self.label.clone();
            shelf.items = items;
        }
        Ok(())
    }
}

/// Person whose pet is written as an item of its own.
#[derive(Debug, Default)]
pub struct Owner {
    pub name: String,
    pub pet: Option<ObjectRef>,
}

impl Domain for Owner {
    fn domain_class() -> &'static DomainClass {
        &OWNER
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerBean {
    #[serde(flatten)]
    core: BeanCore,
    name: String,
    pet: ReferenceBean,
}

impl Bean for OwnerBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        if let Some(owner) = obj.downcast::<Owner>() {
            let (name, pet) = {
                let owner = owner.borrow();
                (owner.name.clone(), owner.pet.clone())
            };
            self.name = name;
            self.pet = ReferenceBean::of_optional(pet.as_ref(), ctx)?;
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Owner::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let pet = self.pet.get(ctx)?;
        if let Some(owner) = obj.downcast::<Owner>() {
            let mut owner = owner.borrow_mut();
            owner.name = self.name.clone();
            owner.pet = pet;
        }
        Ok(())
    }
}

/// Everything, with a bean for the root of the animal hierarchy only.
#[derive(Default)]
pub struct GraphV1;

impl VersionDriver for GraphV1 {
    fn version_id(&self) -> &str {
        GRAPH_V1
    }

    fn register_beans(&self, registry: &mut BeanRegistry) {
        registry.register(&NODE, BeanClass::of::<NodeBean>());
        registry.register(&LINK, BeanClass::of::<LinkBean>());
        registry.register(&ANIMAL, BeanClass::of::<AnimalBean>());
        registry.register(&SHELF, BeanClass::of::<ShelfBean>());
        registry.register(&OWNER, BeanClass::of::<OwnerBean>());
        // Subclasses share the Animal bean but must be known by name
        registry.declare_class(&PUPPY);
    }
}

/// A later schema that dropped animals.
#[derive(Default)]
pub struct GraphV2;

impl VersionDriver for GraphV2 {
    fn version_id(&self) -> &str {
        GRAPH_V2
    }

    fn register_beans(&self, registry: &mut BeanRegistry) {
        registry.register(&NODE, BeanClass::of::<NodeBean>());
        registry.register(&LINK, BeanClass::of::<LinkBean>());
    }
}

pub fn versions() -> VersionRegistry {
    let mut versions = VersionRegistry::new();
    versions.register_version::<GraphV1>();
    versions.register_version::<GraphV2>();
    versions
}

pub fn session_with(format: JsonFormatConfig) -> JsonSession {
    init_tracing();
    PersistenceSession::json(versions(), SessionConfig::new(GRAPH_V1), format)
        .expect("fixture session")
}

pub fn session() -> JsonSession {
    session_with(JsonFormatConfig::plain())
}
