//! One-shot callback store for deferred callables

use crate::{CallbackRef, NodeError, NodeResult};
use core::cell::RefCell;
use critical_section::Mutex;
use heapless::Vec;

struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

impl<T> Slot<T> {
    const EMPTY: Self = Slot {
        generation: 0,
        value: None,
    };
}

struct Slots<T, const N: usize> {
    slots: [Slot<T>; N],
    /// Slots freed by take/release, reused first
    free: Vec<u16, N>,
    /// Slots at or above this index have never been handed out
    fresh: usize,
    live: usize,
}

impl<T, const N: usize> Slots<T, N> {
    const fn new() -> Self {
        Self {
            slots: [const { Slot::EMPTY }; N],
            free: Vec::new(),
            fresh: 0,
            live: 0,
        }
    }

    fn insert(&mut self, value: T) -> Result<CallbackRef, T> {
        let index = match self.free.pop() {
            Some(index) => index as usize,
            None if self.fresh < N => {
                self.fresh += 1;
                self.fresh - 1
            }
            None => return Err(value),
        };
        let slot = &mut self.slots[index];
        slot.value = Some(value);
        self.live += 1;
        Ok(CallbackRef::new(index as u16, slot.generation))
    }

    fn remove(&mut self, key: &CallbackRef) -> Option<T> {
        let slot = self.slots.get_mut(key.slot())?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        // free has room for every slot index
        let _ = self.free.push(key.slot() as u16);
        Some(value)
    }

    fn contains(&self, key: &CallbackRef) -> bool {
        self.slots
            .get(key.slot())
            .is_some_and(|slot| slot.generation == key.generation() && slot.value.is_some())
    }
}

/// Fixed arena of deferred callables, each retrievable exactly once.
///
/// A stored value is in exactly one state: pending, taken, or released. The
/// [`CallbackRef`] handed out by [`store`](Self::store) is consumed by
/// [`take`](Self::take) or [`release`](Self::release), and the slot
/// generation moves on, so a reference rebuilt from an old task parameter
/// can never reach the value a second time.
///
/// Taking or releasing a stale reference is a programming error: it trips a
/// debug assertion, and in release builds logs and returns nothing.
pub struct CallbackStore<T, const N: usize> {
    inner: Mutex<RefCell<Slots<T, N>>>,
}

impl<T, const N: usize> CallbackStore<T, N> {
    /// Create a new empty store
    pub const fn new() -> Self {
        const { assert!(N <= 1 << 16, "callback store is limited to 65536 slots") };
        Self {
            inner: Mutex::new(RefCell::new(Slots::new())),
        }
    }

    /// Store a callable until it is taken or released
    pub fn store(&self, value: T) -> NodeResult<CallbackRef> {
        // The rejected value is dropped outside the critical section
        let result = critical_section::with(|cs| self.inner.borrow_ref_mut(cs).insert(value));
        result.map_err(|_rejected| {
            log::warn!("callback store full ({} slots)", N);
            NodeError::CallbackStoreFull
        })
    }

    /// Remove and return a pending callable for its one invocation
    pub fn take(&self, key: CallbackRef) -> Option<T> {
        let value = critical_section::with(|cs| self.inner.borrow_ref_mut(cs).remove(&key));
        if value.is_none() {
            Self::misuse("take", &key);
        }
        value
    }

    /// Discard a pending callable without invoking it.
    ///
    /// Returns `false` if the reference was stale.
    pub fn release(&self, key: CallbackRef) -> bool {
        let value = critical_section::with(|cs| self.inner.borrow_ref_mut(cs).remove(&key));
        match value {
            Some(value) => {
                drop(value);
                true
            }
            None => {
                Self::misuse("release", &key);
                false
            }
        }
    }

    /// Check if a reference still points at a pending callable
    pub fn is_pending(&self, key: &CallbackRef) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).contains(key))
    }

    /// Number of pending callables
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).live)
    }

    /// Check if no callable is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the maximum number of pending callables
    pub const fn capacity(&self) -> usize {
        N
    }

    fn misuse(op: &str, key: &CallbackRef) {
        log::error!("{}: {} of {} which is not pending", NodeError::StaleCallbackRef, op, key);
        debug_assert!(false, "callback {} of {} which is not pending", op, key);
    }
}

impl<T, const N: usize> Default for CallbackStore<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_take_once() {
        let store: CallbackStore<u32, 4> = CallbackStore::new();

        let key = store.store(7).unwrap();
        assert!(store.is_pending(&key));
        assert_eq!(store.len(), 1);

        assert_eq!(store.take(key), Some(7));
        assert!(store.is_empty());
    }

    #[test]
    fn test_release_discards() {
        let store: CallbackStore<u32, 4> = CallbackStore::new();

        let key = store.store(1).unwrap();
        assert!(store.release(key));
        assert!(store.is_empty());
    }

    #[test]
    fn test_full_store_rejects() {
        let store: CallbackStore<u32, 2> = CallbackStore::new();

        store.store(1).unwrap();
        store.store(2).unwrap();
        assert_eq!(store.store(3), Err(NodeError::CallbackStoreFull));
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let store: CallbackStore<u32, 1> = CallbackStore::new();

        let first = store.store(1).unwrap();
        let stale_param = CallbackRef::new(first.slot() as u16, first.generation()).into_param();
        assert_eq!(store.take(first), Some(1));

        let second = store.store(2).unwrap();
        assert_eq!(second.slot(), 0);
        assert_ne!(second.generation(), CallbackRef::from_param(stale_param).generation());
        assert!(!store.is_pending(&CallbackRef::from_param(stale_param)));
        assert!(store.is_pending(&second));
    }

    #[test]
    #[should_panic(expected = "which is not pending")]
    #[cfg(debug_assertions)]
    fn test_double_take_faults_in_debug() {
        let store: CallbackStore<u32, 2> = CallbackStore::new();

        let key = store.store(5).unwrap();
        let param = key.into_param();
        assert_eq!(store.take(CallbackRef::from_param(param)), Some(5));
        store.take(CallbackRef::from_param(param));
    }

    #[test]
    #[should_panic(expected = "which is not pending")]
    #[cfg(debug_assertions)]
    fn test_release_after_take_faults_in_debug() {
        let store: CallbackStore<u32, 2> = CallbackStore::new();

        let param = store.store(5).unwrap().into_param();
        store.take(CallbackRef::from_param(param));
        store.release(CallbackRef::from_param(param));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_stale_ref_is_a_no_op_in_release() {
        let store: CallbackStore<u32, 2> = CallbackStore::new();

        let param = store.store(5).unwrap().into_param();
        assert_eq!(store.take(CallbackRef::from_param(param)), Some(5));

        assert_eq!(store.take(CallbackRef::from_param(param)), None);
        assert!(!store.release(CallbackRef::from_param(param)));
        assert!(store.is_empty());

        let fresh = store.store(6).unwrap();
        assert!(!store.release(CallbackRef::from_param(param)));
        assert!(store.is_pending(&fresh));
    }
}
