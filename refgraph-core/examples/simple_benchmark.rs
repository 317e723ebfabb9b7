/*!
Simple benchmark example for hyperfine performance testing.

Writes a ring of nodes (one frame spanning every item) to a gzip document and
reads it back.
*/

use refgraph_core::{
    shared, Bean, BeanClass, BeanCore, BeanRegistry, Domain, DomainClass, JsonFormatConfig,
    ObjectRef, PersistenceContext, PersistenceSession, ReferenceBean, Result, SessionConfig,
    Shared, VersionDriver, VersionRegistry,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::time::Instant;

const RING_SIZE: usize = 2_000;

static NODE: DomainClass = DomainClass::new("Node", None);

#[derive(Default)]
struct Node {
    payload: String,
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
    payload: String,
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
            let (payload, next) = {
                let node = node.borrow();
                (node.payload.clone(), node.next.clone().map(ObjectRef::from))
            };
            self.payload = payload;
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
            node.payload = self.payload.clone();
            node.next = next;
        }
        Ok(())
    }
}

#[derive(Default)]
struct BenchV1;

impl VersionDriver for BenchV1 {
    fn version_id(&self) -> &str {
        "bench/1"
    }

    fn register_beans(&self, registry: &mut BeanRegistry) {
        registry.register(&NODE, BeanClass::of::<NodeBean>());
    }
}

fn main() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let file_path = temp_dir.path().join("benchmark_ring.json.gz");

    let mut versions = VersionRegistry::new();
    versions.register_version::<BenchV1>();
    let mut session = PersistenceSession::json(
        versions,
        SessionConfig::new("bench/1"),
        JsonFormatConfig::compressed(),
    )
    .unwrap();

    let nodes: Vec<Shared<Node>> = (0..RING_SIZE)
        .map(|i| {
            shared(Node {
                payload: format!("node {i} of the benchmark ring"),
                next: None,
            })
        })
        .collect();
    for (i, node) in nodes.iter().enumerate() {
        node.borrow_mut().next = Some(nodes[(i + 1) % RING_SIZE].clone());
    }

    let start = Instant::now();

    // Perform write operation
    session.start_writing(File::create(&file_path).unwrap()).unwrap();
    session.serialize(&ObjectRef::from(nodes[0].clone())).unwrap();
    session.end().unwrap();
    let written = start.elapsed();

    // Perform read operation
    session.start_reading(File::open(&file_path).unwrap()).unwrap();
    let mut read = 0;
    while session.deserialize(&NODE).unwrap().is_some() {
        read += 1;
    }

    let duration = start.elapsed();

    // Break the ring so the nodes can be dropped
    for node in &nodes {
        node.borrow_mut().next = None;
    }

    assert_eq!(read, RING_SIZE);

    println!("Benchmark operation completed in: {:?}", duration);
    println!("  Write: {:?}", written);
    println!("  Read: {:?}", duration - written);
    println!(
        "File size: {} bytes",
        std::fs::metadata(&file_path).unwrap().len()
    );
}
