/*!
Frame bookkeeping: a partition of root ids into groups that must be resolved
together.
*/

use crate::ids::RefId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Root ids that reference each other across root boundaries.
pub type Frame = BTreeSet<RefId>;

/// Incremental connected components over root ids.
#[derive(Debug, Default, Clone)]
pub struct FrameSet {
    frames: BTreeMap<usize, Frame>,
    lookup: HashMap<RefId, usize>,
    next_slot: usize,
}

impl FrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.lookup.clear();
        self.next_slot = 0;
    }

    /// The frame containing `root`, if any.
    pub fn frame_of(&self, root: RefId) -> Option<&Frame> {
        self.lookup.get(&root).and_then(|slot| self.frames.get(slot))
    }

    /// Records that two roots belong to the same frame.
    ///
    /// Creates a frame when neither root has one, absorbs the frameless root
    /// when only one does, and merges the two frames otherwise.
    pub fn connect(&mut self, a: RefId, b: RefId) {
        match (self.lookup.get(&a).copied(), self.lookup.get(&b).copied()) {
            (None, None) => {
                self.insert([a, b]);
            }
            (Some(slot), None) => self.absorb(slot, b),
            (None, Some(slot)) => self.absorb(slot, a),
            (Some(left), Some(right)) if left == right => {}
            (Some(left), Some(right)) => {
                // Fold the smaller frame into the larger one
                let (keep, drop) = if self.frame_len(left) >= self.frame_len(right) {
                    (left, right)
                } else {
                    (right, left)
                };
                if let Some(moved) = self.frames.remove(&drop) {
                    for root in &moved {
                        self.lookup.insert(*root, keep);
                    }
                    if let Some(frame) = self.frames.get_mut(&keep) {
                        frame.extend(moved);
                    }
                }
            }
        }
    }

    /// Adds a complete frame, as read from a document header.
    pub fn insert<I>(&mut self, members: I)
    where
        I: IntoIterator<Item = RefId>,
    {
        let frame: Frame = members.into_iter().collect();
        if frame.is_empty() {
            return;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        for root in &frame {
            self.lookup.insert(*root, slot);
        }
        self.frames.insert(slot, frame);
    }

    /// Drops the frame containing `root` and returns it.
    pub fn remove(&mut self, root: RefId) -> Option<Frame> {
        let slot = self.lookup.get(&root).copied()?;
        let frame = self.frames.remove(&slot)?;
        for member in &frame {
            self.lookup.remove(member);
        }
        Some(frame)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Frames as sorted id lists, ordered by their smallest member.
    pub fn to_lists(&self) -> Vec<Vec<RefId>> {
        let mut lists: Vec<Vec<RefId>> = self
            .frames
            .values()
            .map(|frame| frame.iter().copied().collect())
            .collect();
        lists.sort();
        lists
    }

    fn frame_len(&self, slot: usize) -> usize {
        self.frames.get(&slot).map_or(0, |frame| frame.len())
    }

    fn absorb(&mut self, slot: usize, root: RefId) {
        if let Some(frame) = self.frames.get_mut(&slot) {
            frame.insert(root);
            self.lookup.insert(root, slot);
        }
    }
}
