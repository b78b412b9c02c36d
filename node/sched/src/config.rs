//! Scheduler configuration

/// Configuration for the cooperative scheduler.
///
/// Hooks are plain function pointers so a configuration can be built in a
/// `const` context and the scheduler placed in a `static`.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Name used in log records
    pub name: &'static str,
    /// Called by the main loop when no task is queued. Must return once a
    /// wake has been signalled.
    ///
    /// Required on targets other than ARM: without it the main loop has no
    /// way to sleep and busy-waits. See [`sleeps_when_idle`](Self::sleeps_when_idle).
    pub idle_hook: Option<fn()>,
    /// Called after every successful post, possibly from interrupt context.
    /// Must not block.
    pub wake_hook: Option<fn()>,
}

impl SchedulerConfig {
    /// Default configuration: architecture idle, no wake hook
    pub const DEFAULT: SchedulerConfig = SchedulerConfig {
        name: "node",
        idle_hook: None,
        wake_hook: None,
    };

    /// Whether an idle main loop sleeps rather than busy-waits: an idle hook
    /// is set, or the target has a native wait-for-interrupt.
    pub const fn sleeps_when_idle(&self) -> bool {
        self.idle_hook.is_some() || cfg!(target_arch = "arm")
    }

    /// Creates a new scheduler configuration builder.
    pub const fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder {
            config: Self::DEFAULT,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for ergonomic scheduler configuration construction.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        SchedulerConfig::builder()
    }
}

impl SchedulerConfigBuilder {
    /// Sets the scheduler name.
    pub const fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets the idle hook.
    pub const fn idle_hook(mut self, hook: fn()) -> Self {
        self.config.idle_hook = Some(hook);
        self
    }

    /// Sets the wake hook.
    pub const fn wake_hook(mut self, hook: fn()) -> Self {
        self.config.wake_hook = Some(hook);
        self
    }

    /// Builds the scheduler configuration.
    pub const fn build(self) -> SchedulerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() {}

    #[test]
    fn scheduler_config_builder() {
        let config = SchedulerConfig::builder()
            .name("test")
            .idle_hook(noop)
            .wake_hook(noop)
            .build();

        assert_eq!(config.name, "test");
        assert!(config.idle_hook.is_some());
        assert!(config.wake_hook.is_some());
    }

    #[test]
    fn scheduler_config_default() {
        let config = SchedulerConfig::default();

        assert_eq!(config.name, "node");
        assert!(config.idle_hook.is_none());
        assert!(config.wake_hook.is_none());
    }

    #[test]
    fn idle_hook_makes_the_loop_sleep() {
        let config = SchedulerConfig::builder().idle_hook(noop).build();
        assert!(config.sleeps_when_idle());
    }

    #[cfg(not(target_arch = "arm"))]
    #[test]
    fn default_config_busy_waits_off_arm() {
        assert!(!SchedulerConfig::DEFAULT.sleeps_when_idle());
    }
}
