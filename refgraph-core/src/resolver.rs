/*!
Reference resolution: object/id bindings, the edges between them, and the
frames computed from those edges.

The resolver owns every session-local cache. Its id generator is the one piece
of state that outlives a session; [`ReferenceResolver::reset`] leaves it alone
and [`ReferenceResolver::hard_reset`] rewinds it.
*/

use crate::bean::{Bean, BeanClass};
use crate::frames::{Frame, FrameSet};
use crate::ids::{RefId, RefIdGenerator};
use crate::object::{ObjectKey, ObjectRef};
use crate::{PersistError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Bidirectional object/id bookkeeping for one session.
pub struct ReferenceResolver {
    ids: RefIdGenerator,
    root_id: RefId,
    ref_ids: HashMap<ObjectKey, RefId>,
    objects: HashMap<RefId, ObjectRef>,
    roots: HashMap<RefId, RefId>,
    beans_by_object: HashMap<ObjectKey, (ObjectRef, Box<dyn Bean>)>,
    beans_by_id: HashMap<RefId, Box<dyn Bean>>,
    references: BTreeMap<RefId, BTreeSet<RefId>>,
    frames: FrameSet,
    serialized: HashMap<ObjectKey, ObjectRef>,
    deferred: Vec<ObjectRef>,
    pinned: HashSet<RefId>,
}

impl ReferenceResolver {
    pub fn new(ids: RefIdGenerator) -> Self {
        Self {
            ids,
            root_id: RefId::NONE,
            ref_ids: HashMap::new(),
            objects: HashMap::new(),
            roots: HashMap::new(),
            beans_by_object: HashMap::new(),
            beans_by_id: HashMap::new(),
            references: BTreeMap::new(),
            frames: FrameSet::new(),
            serialized: HashMap::new(),
            deferred: Vec::new(),
            pinned: HashSet::new(),
        }
    }

    pub fn generator(&self) -> &RefIdGenerator {
        &self.ids
    }

    pub fn generate_ref_id(&self) -> Result<RefId> {
        self.ids.generate()
    }

    /// Clears every session-local cache. The id counter keeps running.
    pub fn reset(&mut self) {
        self.root_id = RefId::NONE;
        self.ref_ids.clear();
        self.objects.clear();
        self.roots.clear();
        self.beans_by_object.clear();
        self.beans_by_id.clear();
        self.references.clear();
        self.frames.clear();
        self.serialized.clear();
        self.deferred.clear();
        self.pinned.clear();
    }

    /// [`ReferenceResolver::reset`] plus a rewind of the shared id counter.
    pub fn hard_reset(&mut self) {
        self.reset();
        self.ids.hard_reset();
    }

    pub fn root_id(&self) -> RefId {
        self.root_id
    }

    pub fn set_root_id(&mut self, root_id: RefId) {
        self.root_id = root_id;
    }

    /// Binds `obj` to `ref_id` under the current root.
    ///
    /// # Errors
    /// * `PersistError::ZeroRefId` - If `ref_id` is zero
    pub fn set_ref_id_for_object(&mut self, obj: &ObjectRef, ref_id: RefId) -> Result<()> {
        if ref_id.is_none() {
            return Err(PersistError::ZeroRefId);
        }
        self.ids.advance_past(ref_id);
        self.ref_ids.insert(obj.key(), ref_id);
        self.roots.insert(ref_id, self.root_id);
        self.objects.insert(ref_id, obj.clone());
        Ok(())
    }

    /// The id bound to `obj`, or [`RefId::NONE`].
    pub fn ref_id_for_object(&self, obj: &ObjectRef) -> RefId {
        self.ref_ids.get(&obj.key()).copied().unwrap_or(RefId::NONE)
    }

    pub fn object(&self, ref_id: RefId) -> Option<ObjectRef> {
        self.objects.get(&ref_id).cloned()
    }

    /// Root under which `ref_id` was bound. Anti-bean markers are their own root.
    ///
    /// # Errors
    /// * `PersistError::BrokenReference` - If the id was never bound inside a root
    pub fn root_id_of(&self, ref_id: RefId) -> Result<RefId> {
        if ref_id.is_anti() {
            return Ok(ref_id);
        }
        match self.roots.get(&ref_id) {
            Some(root) if !root.is_none() => Ok(*root),
            _ => Err(PersistError::broken_reference(format!(
                "reference to a non-existing object {ref_id}"
            ))),
        }
    }

    /// Records a parent→child edge for frame computation.
    pub fn set_reference(&mut self, parent: RefId, child: RefId) -> Result<()> {
        if parent.is_none() || child.is_none() {
            return Err(PersistError::ZeroRefId);
        }
        self.references.entry(parent).or_default().insert(child);
        Ok(())
    }

    pub fn references(&self) -> &BTreeMap<RefId, BTreeSet<RefId>> {
        &self.references
    }

    /// Recomputes frames from every recorded edge.
    ///
    /// Edges whose endpoints share a root are internal to one item and ignored;
    /// the rest join their two roots into one frame.
    pub fn update_frames(&mut self) -> Result<()> {
        self.frames.clear();
        for (parent, children) in &self.references {
            let parent_root = self.root_id_of(*parent)?;
            for child in children {
                let child_root = self.root_id_of(*child)?;
                if parent_root != child_root {
                    self.frames.connect(parent_root, child_root);
                }
            }
        }
        debug!(
            edges = self.references.values().map(BTreeSet::len).sum::<usize>(),
            frames = self.frames.len(),
            "frames updated"
        );
        Ok(())
    }

    pub fn frame(&self, root: RefId) -> Option<&Frame> {
        self.frames.frame_of(root)
    }

    /// Frames as sorted id lists, for the document header.
    pub fn frames(&self) -> Vec<Vec<RefId>> {
        self.frames.to_lists()
    }

    /// Installs frames read from a document header.
    ///
    /// Objects named by anti-bean members stay resolvable until the session
    /// ends, since a later item will point back at them.
    pub fn set_frames(&mut self, frames: Vec<Vec<RefId>>) {
        self.frames.clear();
        for frame in frames {
            self.pinned
                .extend(frame.iter().filter(|id| id.is_anti()).map(RefId::target));
            self.frames.insert(frame);
        }
    }

    pub fn remove_frame(&mut self, frame: &Frame) {
        if let Some(first) = frame.iter().next() {
            self.frames.remove(*first);
        }
    }

    /// True once every member of `frame` has a cached bean.
    pub fn is_frame_available(&self, frame: &Frame) -> bool {
        frame.iter().all(|id| self.beans_by_id.contains_key(id))
    }

    /// A new bean of `class` carrying a freshly generated id.
    pub fn create_bean(&self, class: &BeanClass) -> Result<Box<dyn Bean>> {
        let mut bean = class.instantiate();
        bean.set_ref_id(self.ids.generate()?);
        Ok(bean)
    }

    /// An empty bean of `class` standing in for the object already written
    /// under `ref_id`.
    pub fn create_anti_bean(&mut self, class: &BeanClass, ref_id: RefId) -> Result<Box<dyn Bean>> {
        if ref_id.is_none() {
            return Err(PersistError::ZeroRefId);
        }
        self.ids.advance_past(ref_id);
        let mut bean = self.create_bean(class)?;
        bean.set_ref_id(ref_id.anti());
        self.set_reference(ref_id.target(), ref_id.anti())?;
        Ok(bean)
    }

    pub fn cache_bean(&mut self, obj: &ObjectRef, bean: Box<dyn Bean>) {
        self.beans_by_object.insert(obj.key(), (obj.clone(), bean));
    }

    pub fn cache_bean_by_id(&mut self, bean: Box<dyn Bean>) {
        self.beans_by_id.insert(bean.ref_id(), bean);
    }

    /// Takes the bean cached for `obj`; the caller owns it from here on.
    pub fn uncache_bean(&mut self, obj: &ObjectRef) -> Option<Box<dyn Bean>> {
        self.beans_by_object
            .remove(&obj.key())
            .map(|(_, bean)| bean)
    }

    pub fn uncache_bean_by_id(&mut self, ref_id: RefId) -> Option<Box<dyn Bean>> {
        self.beans_by_id.remove(&ref_id)
    }

    /// Evicts a consumed object and its beans from every cache.
    pub fn release_object(&mut self, obj: &ObjectRef) {
        let key = obj.key();
        self.beans_by_object.remove(&key);
        let Some(ref_id) = self.ref_ids.get(&key).copied() else {
            return;
        };
        self.beans_by_id.remove(&ref_id);
        if self.pinned.contains(&ref_id) {
            return;
        }
        self.ref_ids.remove(&key);
        self.objects.remove(&ref_id);
        self.roots.remove(&ref_id);
    }

    pub fn is_serialized(&self, obj: &ObjectRef) -> bool {
        self.serialized.contains_key(&obj.key())
    }

    pub fn set_serialized(&mut self, obj: &ObjectRef) {
        self.serialized.insert(obj.key(), obj.clone());
    }

    /// Queues an object that was referenced before it was written.
    pub fn defer(&mut self, obj: &ObjectRef) {
        self.deferred.push(obj.clone());
    }

    pub fn take_deferred(&mut self) -> Vec<ObjectRef> {
        std::mem::take(&mut self.deferred)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
