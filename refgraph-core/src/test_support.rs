//! Domain types and beans shared by the unit tests.

use crate::bean::{Bean, BeanClass, BeanCore, FactoryBean, ReferenceBean};
use crate::context::PersistenceContext;
use crate::ids::RefIdGenerator;
use crate::object::{shared, Domain, DomainClass, ObjectRef, Shared};
use crate::registry::BeanRegistry;
use crate::version::{VersionDriver, VersionRegistry};
use crate::Result;
use serde::{Deserialize, Serialize};

pub static SHAPE: DomainClass = DomainClass::new("Shape", None);
pub static POLYGON: DomainClass = DomainClass::new("Polygon", Some(&SHAPE));
pub static SQUARE: DomainClass = DomainClass::new("Square", Some(&POLYGON));
pub static NODE: DomainClass = DomainClass::new("Node", None);
pub static TREE: DomainClass = DomainClass::new("Tree", None);
pub static CONTAINER: DomainClass = DomainClass::new("Container", None);
pub static MARKER: DomainClass =
    DomainClass::self_adapting("Marker", None, BeanClass::of::<MarkerBean>);

pub const TEST_VERSION: &str = "test/1";

/// Node with children written as separate items.
#[derive(Debug, Default)]
pub struct Node {
    pub name: String,
    pub children: Vec<Shared<Node>>,
}

impl Domain for Node {
    fn domain_class() -> &'static DomainClass {
        &NODE
    }
}

pub fn node(name: &str) -> Shared<Node> {
    shared(Node {
        name: name.to_string(),
        children: Vec::new(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeBean {
    #[serde(flatten)]
    pub core: BeanCore,
    pub name: String,
    pub children: Vec<ReferenceBean>,
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
        let children: Vec<ObjectRef> = node
            .borrow()
            .children
            .iter()
            .cloned()
            .map(ObjectRef::from)
            .collect();
        self.name = node.borrow().name.clone();
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
            node.name = self.name.clone();
            node.children = children;
        }
        Ok(())
    }
}

/// Tree whose branches are embedded in the parent's bean.
#[derive(Debug, Default)]
pub struct Tree {
    pub name: String,
    pub branches: Vec<Shared<Tree>>,
}

impl Domain for Tree {
    fn domain_class() -> &'static DomainClass {
        &TREE
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeBean {
    #[serde(flatten)]
    pub core: BeanCore,
    pub name: String,
    pub branches: Vec<TreeBean>,
}

impl Bean for TreeBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let Some(tree) = obj.downcast::<Tree>() else {
            return Ok(());
        };
        let tree = tree.borrow();
        self.name = tree.name.clone();
        self.branches.clear();
        for branch in &tree.branches {
            let mut bean = TreeBean {
                core: BeanCore::new(ctx.resolver().generate_ref_id()?),
                ..TreeBean::default()
            };
            bean.set(&ObjectRef::from(branch.clone()), ctx)?;
            self.branches.push(bean);
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Tree::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let mut branches = Vec::with_capacity(self.branches.len());
        for branch in &mut self.branches {
            if let Some(branch) = branch.get(ctx)?.and_then(|b| b.downcast::<Tree>()) {
                branches.push(branch);
            }
        }
        if let Some(tree) = obj.downcast::<Tree>() {
            let mut tree = tree.borrow_mut();
            tree.name = self.name.clone();
            tree.branches = branches;
        }
        Ok(())
    }
}

/// Plain value type shared by a small class hierarchy.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shape {
    pub label: String,
    pub sides: u32,
}

impl Domain for Shape {
    fn domain_class() -> &'static DomainClass {
        &SHAPE
    }
}

pub fn shape(label: &str, sides: u32) -> Shared<Shape> {
    shared(Shape {
        label: label.to_string(),
        sides,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeBean {
    #[serde(flatten)]
    pub core: BeanCore,
    pub label: String,
    pub sides: u32,
}

impl Bean for ShapeBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, _ctx: &mut PersistenceContext) -> Result<()> {
        if let Some(shape) = obj.downcast::<Shape>() {
            let shape = shape.borrow();
            self.label = shape.label.clone();
            self.sides = shape.sides;
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Shape {
            label: self.label.clone(),
            sides: self.sides,
        })))
    }
}

/// Heterogeneous collection written through factory beans.
#[derive(Debug, Default)]
pub struct Container {
    pub items: Vec<ObjectRef>,
}

impl Domain for Container {
    fn domain_class() -> &'static DomainClass {
        &CONTAINER
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerBean {
    #[serde(flatten)]
    pub core: BeanCore,
    pub items: Vec<FactoryBean>,
}

impl Bean for ContainerBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let Some(container) = obj.downcast::<Container>() else {
            return Ok(());
        };
        let items = container.borrow().items.clone();
        self.items = items
            .iter()
            .map(|item| FactoryBean::of(item, ctx))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(Some(ObjectRef::new(Container::default())))
    }

    fn populate(&mut self, obj: &ObjectRef, ctx: &mut PersistenceContext) -> Result<()> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in &mut self.items {
            if let Some(item) = item.get(ctx)? {
                items.push(item);
            }
        }
        if let Some(container) = obj.downcast::<Container>() {
            container.borrow_mut().items = items;
        }
        Ok(())
    }
}

/// Bean of the self-adapting marker class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerBean {
    #[serde(flatten)]
    pub core: BeanCore,
}

impl Bean for MarkerBean {
    fn core(&self) -> &BeanCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BeanCore {
        &mut self.core
    }

    fn fill(&mut self, _obj: &ObjectRef, _ctx: &mut PersistenceContext) -> Result<()> {
        Ok(())
    }

    fn create_object(&mut self, _ctx: &mut PersistenceContext) -> Result<Option<ObjectRef>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct TestDriver;

impl VersionDriver for TestDriver {
    fn version_id(&self) -> &str {
        TEST_VERSION
    }

    fn register_beans(&self, registry: &mut BeanRegistry) {
        register_all(registry);
    }
}

pub fn register_all(registry: &mut BeanRegistry) {
    registry.register(&NODE, BeanClass::of::<NodeBean>());
    registry.register(&TREE, BeanClass::of::<TreeBean>());
    registry.register(&SHAPE, BeanClass::of::<ShapeBean>());
    registry.register(&CONTAINER, BeanClass::of::<ContainerBean>());
}

pub fn versions() -> VersionRegistry {
    let mut versions = VersionRegistry::new();
    versions.register_version::<TestDriver>();
    versions
}

/// Context with every test bean registered.
pub fn context() -> PersistenceContext {
    let mut ctx = PersistenceContext::new(RefIdGenerator::new());
    register_all(ctx.registry_mut());
    ctx
}
