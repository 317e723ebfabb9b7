/*!
Tests for reference bookkeeping and frame computation.
*/

use super::*;
use crate::test_support::{shape, ShapeBean};

fn id(raw: i64) -> RefId {
    RefId::new(raw)
}

fn resolver() -> ReferenceResolver {
    ReferenceResolver::new(RefIdGenerator::new())
}

/// Binds a fresh object to `ref_id` as if it were written under `root`.
fn bind(resolver: &mut ReferenceResolver, ref_id: i64, root: i64) -> ObjectRef {
    let obj = ObjectRef::from(shape("s", 1));
    resolver.set_root_id(id(root));
    resolver.set_ref_id_for_object(&obj, id(ref_id)).unwrap();
    obj
}

#[test]
fn test_binding_is_bidirectional() {
    let mut resolver = resolver();
    let obj = bind(&mut resolver, 4, 4);

    assert_eq!(resolver.ref_id_for_object(&obj), id(4));
    assert!(resolver.object(id(4)).unwrap().ptr_eq(&obj));
    assert_eq!(resolver.root_id_of(id(4)).unwrap(), id(4));

    let unbound = ObjectRef::from(shape("t", 3));
    assert!(resolver.ref_id_for_object(&unbound).is_none());
}

#[test]
fn test_zero_ids_are_rejected() {
    let mut resolver = resolver();
    let obj = ObjectRef::from(shape("s", 1));

    assert!(matches!(
        resolver.set_ref_id_for_object(&obj, RefId::NONE),
        Err(PersistError::ZeroRefId)
    ));
    assert!(matches!(
        resolver.set_reference(RefId::NONE, id(2)),
        Err(PersistError::ZeroRefId)
    ));
    assert!(matches!(
        resolver.set_reference(id(2), RefId::NONE),
        Err(PersistError::ZeroRefId)
    ));
}

#[test]
fn test_binding_advances_generator() {
    let mut resolver = resolver();
    bind(&mut resolver, 30, 30);
    assert_eq!(resolver.generate_ref_id().unwrap(), id(31));
}

#[test]
fn test_root_of_unknown_id_is_broken() {
    let resolver = resolver();
    assert!(matches!(
        resolver.root_id_of(id(5)),
        Err(PersistError::BrokenReference(_))
    ));
    // Anti-bean markers are roots of their own
    assert_eq!(resolver.root_id_of(id(-5)).unwrap(), id(-5));
}

#[test]
fn test_edges_inside_one_root_make_no_frame() {
    let mut resolver = resolver();
    bind(&mut resolver, 1, 1);
    bind(&mut resolver, 2, 1);
    resolver.set_reference(id(1), id(2)).unwrap();

    resolver.update_frames().unwrap();
    assert!(resolver.frames().is_empty());
}

#[test]
fn test_cross_root_edges_join_frames() {
    let mut resolver = resolver();
    bind(&mut resolver, 1, 1);
    bind(&mut resolver, 2, 2);
    bind(&mut resolver, 3, 2);
    bind(&mut resolver, 4, 4);
    resolver.set_reference(id(1), id(3)).unwrap();
    resolver.set_reference(id(4), id(4)).unwrap();

    resolver.update_frames().unwrap();
    assert_eq!(resolver.frames(), vec![vec![id(1), id(2)]]);
    assert!(resolver.frame(id(2)).is_some());
    assert!(resolver.frame(id(4)).is_none());
}

#[test]
fn test_update_frames_is_idempotent() {
    let mut resolver = resolver();
    bind(&mut resolver, 1, 1);
    bind(&mut resolver, 2, 2);
    resolver.set_reference(id(1), id(2)).unwrap();
    resolver.set_reference(id(2), id(1)).unwrap();

    resolver.update_frames().unwrap();
    let first = resolver.frames();
    resolver.update_frames().unwrap();
    assert_eq!(resolver.frames(), first);
    assert_eq!(first, vec![vec![id(1), id(2)]]);
}

#[test]
fn test_dangling_edge_fails_frame_update() {
    let mut resolver = resolver();
    bind(&mut resolver, 1, 1);
    resolver.set_reference(id(1), id(9)).unwrap();
    assert!(matches!(
        resolver.update_frames(),
        Err(PersistError::BrokenReference(_))
    ));
}

#[test]
fn test_anti_bean_joins_owner_frame() {
    let mut resolver = resolver();
    // Object 2 was embedded in item 1, then written again at top level
    bind(&mut resolver, 1, 1);
    bind(&mut resolver, 2, 1);

    let anti = resolver
        .create_anti_bean(&BeanClass::of::<ShapeBean>(), id(2))
        .unwrap();
    assert_eq!(anti.ref_id(), id(-2));
    assert!(resolver.references()[&id(2)].contains(&id(-2)));

    resolver.update_frames().unwrap();
    assert_eq!(resolver.frames(), vec![vec![id(-2), id(1)]]);
}

#[test]
fn test_create_bean_draws_fresh_ids() {
    let resolver = resolver();
    let class = BeanClass::of::<ShapeBean>();
    let first = resolver.create_bean(&class).unwrap();
    let second = resolver.create_bean(&class).unwrap();
    assert_eq!(first.ref_id(), id(1));
    assert_eq!(second.ref_id(), id(2));
}

#[test]
fn test_set_frames_and_availability() {
    let mut resolver = resolver();
    resolver.set_frames(vec![vec![id(1), id(2)]]);
    let frame = resolver.frame(id(1)).cloned().unwrap();
    assert!(!resolver.is_frame_available(&frame));

    for raw in [1, 2] {
        let mut bean = ShapeBean::default();
        bean.set_ref_id(id(raw));
        resolver.cache_bean_by_id(Box::new(bean));
    }
    assert!(resolver.is_frame_available(&frame));

    resolver.remove_frame(&frame);
    assert!(resolver.frame(id(2)).is_none());
    assert!(resolver.uncache_bean_by_id(id(1)).is_some());
    assert!(resolver.uncache_bean_by_id(id(1)).is_none());
}

#[test]
fn test_release_evicts_object() {
    let mut resolver = resolver();
    let obj = bind(&mut resolver, 6, 6);
    resolver.cache_bean(&obj, Box::new(ShapeBean::default()));

    resolver.release_object(&obj);
    assert!(resolver.object(id(6)).is_none());
    assert!(resolver.ref_id_for_object(&obj).is_none());
    assert!(resolver.uncache_bean(&obj).is_none());
}

#[test]
fn test_anti_bean_targets_are_pinned() {
    let mut resolver = resolver();
    resolver.set_frames(vec![vec![id(-6), id(3)]]);
    let obj = bind(&mut resolver, 6, 3);

    resolver.release_object(&obj);
    assert!(resolver.object(id(6)).unwrap().ptr_eq(&obj));

    // Pins do not survive the session
    resolver.reset();
    let obj = bind(&mut resolver, 6, 3);
    resolver.release_object(&obj);
    assert!(resolver.object(id(6)).is_none());
}

#[test]
fn test_deferred_and_serialized_tracking() {
    let mut resolver = resolver();
    let obj = ObjectRef::from(shape("d", 2));

    assert!(!resolver.is_serialized(&obj));
    resolver.set_serialized(&obj);
    assert!(resolver.is_serialized(&obj));

    resolver.defer(&obj);
    let deferred = resolver.take_deferred();
    assert_eq!(deferred.len(), 1);
    assert!(resolver.take_deferred().is_empty());
}

#[test]
fn test_reset_keeps_counter_and_hard_reset_rewinds() {
    let mut resolver = resolver();
    let obj = bind(&mut resolver, 10, 10);
    resolver.set_serialized(&obj);

    resolver.reset();
    assert!(resolver.object(id(10)).is_none());
    assert!(!resolver.is_serialized(&obj));
    assert!(resolver.root_id().is_none());
    assert_eq!(resolver.generate_ref_id().unwrap(), id(11));

    resolver.hard_reset();
    assert_eq!(resolver.generate_ref_id().unwrap(), id(1));
}
