//! Simulated board and flash for hosted runs

use node_boot::{Platform, Storage};
use node_sched::{NodeError, NodeResult};

/// Host stand-in for the board support package.
///
/// A restart cannot reset the process, so it is counted and the caller is
/// expected to run the boot sequence again.
#[derive(Debug, Default)]
pub struct HostPlatform {
    fail_init: bool,
    initialized: bool,
    restarts: usize,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform whose bring-up always fails
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of restarts requested so far
    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

impl Platform for HostPlatform {
    fn init(&mut self) -> NodeResult<()> {
        if self.fail_init {
            return Err(NodeError::PlatformInit);
        }
        self.initialized = true;
        log::debug!("host platform initialized");
        Ok(())
    }

    fn restart(&mut self) {
        self.restarts += 1;
        self.initialized = false;
        log::warn!("restart requested (#{})", self.restarts);
    }
}

/// In-memory flash filesystem.
///
/// Tracks the configured and detected flash sizes, whether a filesystem has
/// been laid down, and whether it is mounted. Mounting unformatted flash
/// fails.
#[derive(Debug)]
pub struct MemStorage {
    configured: u32,
    detected: u32,
    formatted: bool,
    mounted: bool,
    fail_format: bool,
    formats: usize,
}

impl MemStorage {
    /// Unformatted flash of `detected` bytes, configured for `configured`
    pub fn new(configured: u32, detected: u32) -> Self {
        Self {
            configured,
            detected,
            formatted: false,
            mounted: false,
            fail_format: false,
            formats: 0,
        }
    }

    /// Formatted flash whose configuration matches the hardware
    pub fn ready(size: u32) -> Self {
        Self {
            formatted: true,
            ..Self::new(size, size)
        }
    }

    /// Make every format attempt fail
    pub fn with_failing_format(mut self) -> Self {
        self.fail_format = true;
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    /// Number of format attempts
    pub fn formats(&self) -> usize {
        self.formats
    }
}

impl Storage for MemStorage {
    fn configured_size(&self) -> u32 {
        self.configured
    }

    fn detected_size(&self) -> u32 {
        self.detected
    }

    fn set_configured_size(&mut self, bytes: u32) {
        log::info!("flash size set to {} bytes", bytes);
        self.configured = bytes;
    }

    fn mount(&mut self) -> NodeResult<()> {
        if !self.formatted {
            return Err(NodeError::Storage);
        }
        self.mounted = true;
        Ok(())
    }

    fn format(&mut self) -> NodeResult<()> {
        self.formats += 1;
        if self.fail_format {
            return Err(NodeError::Storage);
        }
        self.formatted = true;
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unformatted_flash_does_not_mount() {
        let mut storage = MemStorage::new(1 << 20, 1 << 20);
        assert_eq!(storage.mount(), Err(NodeError::Storage));

        storage.format().unwrap();
        assert!(storage.is_mounted());
        storage.unmount();
        assert!(storage.mount().is_ok());
    }

    #[test]
    fn test_failing_format_leaves_flash_unformatted() {
        let mut storage = MemStorage::new(1 << 20, 1 << 20).with_failing_format();
        assert!(storage.format().is_err());
        assert_eq!(storage.formats(), 1);
        assert!(!storage.is_formatted());
    }

    #[test]
    fn test_platform_restart_counts() {
        let mut platform = HostPlatform::new();
        platform.init().unwrap();
        assert!(platform.is_initialized());
        platform.restart();
        assert_eq!(platform.restarts(), 1);
        assert!(!platform.is_initialized());

        assert_eq!(HostPlatform::failing().init(), Err(NodeError::PlatformInit));
    }
}
