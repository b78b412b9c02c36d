//! Task descriptors, parameters, handler identities and callback references

use core::fmt;
use crate::TaskPriority;

/// Single machine-word task parameter.
///
/// Carries either a small integer (a flag, a character, a count) or an
/// encoded [`CallbackRef`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskParam(pub usize);

impl TaskParam {
    /// Create a parameter from a raw word
    pub const fn new(raw: usize) -> Self {
        TaskParam(raw)
    }

    /// Get the raw word
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Interpret the parameter as a flag (non-zero is `true`)
    pub const fn as_bool(self) -> bool {
        self.0 != 0
    }
}

impl From<usize> for TaskParam {
    fn from(raw: usize) -> Self {
        TaskParam(raw)
    }
}

impl From<u8> for TaskParam {
    fn from(raw: u8) -> Self {
        TaskParam(raw as usize)
    }
}

impl From<bool> for TaskParam {
    fn from(flag: bool) -> Self {
        TaskParam(flag as usize)
    }
}

impl fmt::Display for TaskParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param({:#x})", self.0)
    }
}

/// Opaque identity of a registered task handler.
///
/// Handed out by the handler registry on first registration and stable for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u8);

impl HandlerId {
    /// Identity for table slot `index`. Only the registry should mint these.
    pub const fn from_index(index: u8) -> Self {
        HandlerId(index)
    }

    /// Table slot backing this identity
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.0)
    }
}

/// A pending unit of work: which handler to run, at what priority, with
/// which parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub priority: TaskPriority,
    pub handler: HandlerId,
    pub param: TaskParam,
}

impl TaskDescriptor {
    pub const fn new(priority: TaskPriority, handler: HandlerId, param: TaskParam) -> Self {
        Self {
            priority,
            handler,
            param,
        }
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.handler, self.priority, self.param)
    }
}

const SLOT_BITS: u32 = 16;
const SLOT_MASK: usize = (1 << SLOT_BITS) - 1;

/// Single-use key for a deferred callable held in a callback store.
///
/// Deliberately neither `Copy` nor `Clone`: taking or releasing consumes the
/// reference. The generation half is bumped by the store on every removal, so
/// a key rebuilt from a stale [`TaskParam`] no longer matches its slot.
#[derive(Debug, PartialEq, Eq)]
pub struct CallbackRef {
    slot: u16,
    generation: u16,
}

impl CallbackRef {
    pub const fn new(slot: u16, generation: u16) -> Self {
        Self { slot, generation }
    }

    pub const fn slot(&self) -> usize {
        self.slot as usize
    }

    pub const fn generation(&self) -> u16 {
        self.generation
    }

    /// Encode into a task parameter for transport through the queue
    pub const fn into_param(self) -> TaskParam {
        TaskParam(((self.generation as usize) << SLOT_BITS) | self.slot as usize)
    }

    /// Recover a reference from a parameter posted by [`Self::into_param`]
    pub const fn from_param(param: TaskParam) -> Self {
        Self {
            slot: (param.0 & SLOT_MASK) as u16,
            generation: ((param.0 >> SLOT_BITS) & SLOT_MASK) as u16,
        }
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({}#{})", self.slot, self.generation)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskDescriptor {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Task{{handler: {=u8}, prio: {}, param: {=usize:#x}}}",
            self.handler.0,
            self.priority,
            self.param.0
        );
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CallbackRef {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Ref({=u16}#{=u16})", self.slot, self.generation);
    }
}
