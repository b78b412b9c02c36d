//! Handler registry: binds handler types to stable identities

use crate::{HandlerId, NodeError, NodeResult, TaskParam, TaskPriority};
use core::any::{type_name, TypeId};
use core::cell::RefCell;
use core::fmt;
use critical_section::Mutex;
use heapless::Vec;

/// Entry point signature every handler resolves to
pub type HandlerFn<C> = fn(&C, TaskParam, TaskPriority);

/// A task handler bound to a context type `C`.
///
/// Handlers are types rather than values so that identity is decided by the
/// type system: registering the same handler type twice always yields the
/// same [`HandlerId`]. `C` is whatever the application hands the dispatcher,
/// typically the process root that owns the scheduler.
pub trait TaskHandler<C: ?Sized>: 'static {
    /// Run to completion with the posted parameter and the priority the task
    /// was dispatched at
    fn run(ctx: &C, param: TaskParam, priority: TaskPriority);
}

/// Resolved registry entry
pub struct HandlerEntry<C: ?Sized> {
    key: TypeId,
    name: &'static str,
    run: HandlerFn<C>,
}

impl<C: ?Sized> HandlerEntry<C> {
    fn of<H: TaskHandler<C>>() -> Self {
        Self {
            key: TypeId::of::<H>(),
            name: type_name::<H>(),
            run: H::run,
        }
    }

    /// Invoke the handler
    pub fn invoke(&self, ctx: &C, param: TaskParam, priority: TaskPriority) {
        (self.run)(ctx, param, priority)
    }

    /// Type name of the handler, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<C: ?Sized> Clone for HandlerEntry<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for HandlerEntry<C> {}

impl<C: ?Sized> fmt::Debug for HandlerEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry").field("name", &self.name).finish()
    }
}

struct HandlerTable<C: ?Sized, const N: usize> {
    entries: Vec<HandlerEntry<C>, N>,
}

impl<C: ?Sized, const N: usize> HandlerTable<C, N> {
    const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn position(&self, key: TypeId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    /// Returns the identity and whether it was newly allocated
    fn insert(&mut self, entry: HandlerEntry<C>) -> NodeResult<(HandlerId, bool)> {
        if let Some(index) = self.position(entry.key) {
            return Ok((HandlerId::from_index(index as u8), false));
        }
        let index = self.entries.len();
        if index > u8::MAX as usize {
            return Err(NodeError::HandlerTableFull);
        }
        self.entries
            .push(entry)
            .map_err(|_| NodeError::HandlerTableFull)?;
        Ok((HandlerId::from_index(index as u8), true))
    }
}

/// Fixed-size table of task handlers.
///
/// Identities are allocated on first registration and never reused or
/// removed. Registration belongs to initialization code in the main context;
/// resolution is cheap and may run on every dispatch.
pub struct HandlerRegistry<C: ?Sized, const N: usize> {
    table: Mutex<RefCell<HandlerTable<C, N>>>,
}

impl<C: ?Sized, const N: usize> HandlerRegistry<C, N> {
    /// Create a new empty registry
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(HandlerTable::new())),
        }
    }

    /// Register handler `H`, or return its existing identity.
    ///
    /// Fails with [`NodeError::HandlerTableFull`] only when the table was
    /// sized for fewer handlers than the firmware defines.
    pub fn register<H: TaskHandler<C>>(&self) -> NodeResult<HandlerId> {
        let entry = HandlerEntry::of::<H>();
        let result = critical_section::with(|cs| self.table.borrow_ref_mut(cs).insert(entry));
        match result {
            Ok((id, true)) => log::debug!("registered {} as {}", entry.name, id),
            Ok(_) => {}
            Err(err) => log::error!("cannot register {}: {}", entry.name, err),
        }
        result.map(|(id, _)| id)
    }

    /// Identity of `H` if it has been registered
    pub fn id_of<H: TaskHandler<C>>(&self) -> Option<HandlerId> {
        let key = TypeId::of::<H>();
        critical_section::with(|cs| self.table.borrow_ref(cs).position(key))
            .map(|index| HandlerId::from_index(index as u8))
    }

    /// Resolve an identity to its handler entry
    pub fn resolve(&self, id: HandlerId) -> Option<HandlerEntry<C>> {
        critical_section::with(|cs| self.table.borrow_ref(cs).entries.get(id.index()).copied())
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.table.borrow_ref(cs).entries.len())
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the maximum number of handlers
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<C: ?Sized, const N: usize> Default for HandlerRegistry<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
