/*!
Reference ids and the counter that hands them out.
*/

use crate::{PersistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Identifier of an object that crossed the serialization boundary.
///
/// Positive values name real objects. A negative value marks an anti-bean and
/// points back at the object with the negated id. Zero is reserved for proxies
/// and beans that are not bound to any object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(i64);

impl RefId {
    /// The unbound id carried by proxies.
    pub const NONE: RefId = RefId(0);

    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// True for anti-bean markers.
    pub fn is_anti(&self) -> bool {
        self.0 < 0
    }

    /// The id of the object this id stands for (anti-bean markers are flipped).
    pub fn target(&self) -> RefId {
        RefId(self.0.abs())
    }

    /// The anti-bean marker for this id.
    pub fn anti(&self) -> RefId {
        RefId(-self.0.abs())
    }
}

impl fmt::Debug for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefId({})", self.0)
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RefId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Monotonic source of reference ids.
///
/// A generator is an explicit value owned by the session that uses it. Clones
/// share the same counter, so a write session and a read session that must not
/// hand out overlapping ids are built from clones of one generator. Sessions
/// built from separate generators (one per thread, typically) never interact.
#[derive(Debug, Clone, Default)]
pub struct RefIdGenerator {
    counter: Arc<AtomicI64>,
}

impl RefIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    ///
    /// # Errors
    /// * `PersistError::IdOverflow` - If the counter reached `i64::MAX`
    pub fn generate(&self) -> Result<RefId> {
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_add(1)
            })
            .map(|previous| RefId(previous + 1))
            .map_err(|_| PersistError::IdOverflow)
    }

    /// Moves the counter past `id` so ids read from a stream never collide
    /// with freshly generated ones.
    pub fn advance_past(&self, id: RefId) {
        self.counter.fetch_max(id.target().as_i64(), Ordering::SeqCst);
    }

    /// The last id handed out (or advanced past).
    pub fn current(&self) -> RefId {
        RefId(self.counter.load(Ordering::SeqCst))
    }

    /// Resets the shared counter to zero.
    ///
    /// Only safe when no other session built from this generator is active.
    pub fn hard_reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn starting_at(raw: i64) -> Self {
        Self {
            counter: Arc::new(AtomicI64::new(raw)),
        }
    }
}
