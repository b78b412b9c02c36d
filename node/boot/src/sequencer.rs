//! Boot sequencer: platform bring-up to runtime start

use crate::{Platform, Storage};
use core::fmt;
use node_task::{HandlerId, Post, TaskParam, TaskPriority};

/// Boot sequence states.
///
/// ```text
/// Init -> PlatformReady -> StorageReady -> RuntimePosted
///   |           |
///   v           v
/// Halted   ReformatAndReboot
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    /// Platform bring-up pending
    Init,
    /// Platform up; storage not yet checked
    PlatformReady,
    /// Storage size mismatch; reformatting and restarting
    ReformatAndReboot,
    /// Storage checked and mounted
    StorageReady,
    /// Runtime-start task posted; nothing further to do
    RuntimePosted,
    /// Platform bring-up failed; the runtime will not start
    Halted,
}

/// How one pass of the boot sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// The runtime-start task is queued
    Started,
    /// Storage was reformatted and a restart requested; nothing was posted
    Rebooting,
    /// Platform bring-up failed; nothing was posted
    Halted,
    /// The runtime-start task could not be queued
    StartDropped,
}

/// Boot sequence options
#[derive(Debug, Clone, Copy)]
pub struct BootConfig {
    /// Compare configured and detected flash size before mounting
    pub check_storage_size: bool,
    /// Mount the filesystem once storage is known good
    pub mount_storage: bool,
    /// Parameter handed to the runtime-start handler
    pub start_param: TaskParam,
}

impl BootConfig {
    pub const DEFAULT: BootConfig = BootConfig {
        check_storage_size: true,
        mount_storage: true,
        start_param: TaskParam::new(b's' as usize),
    };
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Drives one boot pass from `Init` to a terminal state.
///
/// The only effect on the scheduler is a single low-priority post of the
/// runtime-start handler once storage is ready. A restart after reformatting
/// starts a fresh pass from `Init`; with the configured size corrected the
/// mismatch cannot repeat.
pub struct BootSequencer {
    config: BootConfig,
    runtime_start: HandlerId,
    state: BootState,
}

impl BootSequencer {
    /// Sequencer that will post `runtime_start` with the default options
    pub const fn new(runtime_start: HandlerId) -> Self {
        Self::with_config(runtime_start, BootConfig::DEFAULT)
    }

    pub const fn with_config(runtime_start: HandlerId, config: BootConfig) -> Self {
        Self {
            config,
            runtime_start,
            state: BootState::Init,
        }
    }

    /// Current state
    pub fn state(&self) -> BootState {
        self.state
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Run a full boot pass
    pub fn run<P, S, Q>(&mut self, platform: &mut P, storage: &mut S, scheduler: &Q) -> BootOutcome
    where
        P: Platform + ?Sized,
        S: Storage + ?Sized,
        Q: Post + ?Sized,
    {
        self.state = BootState::Init;
        loop {
            if let Some(outcome) = self.step(platform, storage, scheduler) {
                log::info!("boot finished in {}: {}", self.state, outcome);
                return outcome;
            }
        }
    }

    fn step<P, S, Q>(
        &mut self,
        platform: &mut P,
        storage: &mut S,
        scheduler: &Q,
    ) -> Option<BootOutcome>
    where
        P: Platform + ?Sized,
        S: Storage + ?Sized,
        Q: Post + ?Sized,
    {
        match self.state {
            BootState::Init => match platform.init() {
                Ok(()) => {
                    self.state = BootState::PlatformReady;
                    None
                }
                Err(err) => {
                    log::error!("can not init platform for modules: {}", err);
                    self.state = BootState::Halted;
                    Some(BootOutcome::Halted)
                }
            },
            BootState::PlatformReady => {
                let configured = storage.configured_size();
                let detected = storage.detected_size();
                if self.config.check_storage_size && configured != detected {
                    log::warn!(
                        "flash size mismatch: configured {} bytes, detected {} bytes",
                        configured,
                        detected
                    );
                    self.state = BootState::ReformatAndReboot;
                    return None;
                }
                if self.config.mount_storage {
                    if let Err(err) = storage.mount() {
                        log::error!("storage mount failed: {}", err);
                    }
                }
                self.state = BootState::StorageReady;
                None
            }
            BootState::ReformatAndReboot => {
                storage.set_configured_size(storage.detected_size());
                match storage.format() {
                    Ok(()) => log::info!("format done"),
                    Err(err) => log::error!(
                        "unable to format ({}); FS might be compromised, re-flashing is advised",
                        err
                    ),
                }
                // format leaves the filesystem mounted
                storage.unmount();
                // The restart redoes the whole sequence; the runtime-start
                // task must not be posted in this pass.
                platform.restart();
                Some(BootOutcome::Rebooting)
            }
            BootState::StorageReady => {
                if scheduler.post(TaskPriority::Low, self.runtime_start, self.config.start_param) {
                    self.state = BootState::RuntimePosted;
                    Some(BootOutcome::Started)
                } else {
                    log::error!("runtime start task not posted: queue full");
                    Some(BootOutcome::StartDropped)
                }
            }
            BootState::RuntimePosted => Some(BootOutcome::Started),
            BootState::Halted => Some(BootOutcome::Halted),
        }
    }
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootState::Init => write!(f, "Init"),
            BootState::PlatformReady => write!(f, "PlatformReady"),
            BootState::ReformatAndReboot => write!(f, "ReformatAndReboot"),
            BootState::StorageReady => write!(f, "StorageReady"),
            BootState::RuntimePosted => write!(f, "RuntimePosted"),
            BootState::Halted => write!(f, "Halted"),
        }
    }
}

impl fmt::Display for BootOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootOutcome::Started => write!(f, "runtime started"),
            BootOutcome::Rebooting => write!(f, "rebooting"),
            BootOutcome::Halted => write!(f, "halted"),
            BootOutcome::StartDropped => write!(f, "runtime start dropped"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BootState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            BootState::Init => defmt::write!(fmt, "Init"),
            BootState::PlatformReady => defmt::write!(fmt, "PlatformReady"),
            BootState::ReformatAndReboot => defmt::write!(fmt, "ReformatAndReboot"),
            BootState::StorageReady => defmt::write!(fmt, "StorageReady"),
            BootState::RuntimePosted => defmt::write!(fmt, "RuntimePosted"),
            BootState::Halted => defmt::write!(fmt, "Halted"),
        }
    }
}
