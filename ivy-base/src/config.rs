use ivy_threadpool::{Priority, Subsystem, SubsystemConfig};

use crate::Extent;

/// Per-[`Subsystem`] worker pool sizing, handed to `ThreadPool::new` as-is.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    pub subsystems: Vec<(Subsystem, SubsystemConfig)>,
}

impl ThreadPoolConfig {
    /// One entry per [`Subsystem::ALL`] with its default [`SubsystemConfig`].
    pub fn default_subsystems() -> Self {
        Self {
            subsystems: Subsystem::ALL
                .into_iter()
                .map(|s| (s, SubsystemConfig::default()))
                .collect(),
        }
    }

    pub fn with_subsystem(mut self, subsystem: Subsystem, config: SubsystemConfig) -> Self {
        if let Some(entry) = self.subsystems.iter_mut().find(|(s, _)| *s == subsystem) {
            entry.1 = config;
        } else {
            self.subsystems.push((subsystem, config));
        }
        self
    }
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self::default_subsystems()
    }
}

/// Top-level engine configuration, built once at startup and threaded
/// through `VulkanContext`/`RenderGraph`/`Handoff` construction in the demo
/// crate's main loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub window_size: Extent,
    pub enable_validation: bool,
    pub enable_raytracing: bool,
    /// Ring size for the sim/render hand-off and GPU resource destruction
    /// queues. Matches `ivy_vulkan::MAX_FRAMES_IN_FLIGHT` by default.
    pub max_frames_in_flight: usize,
    pub thread_pool: ThreadPoolConfig,
    pub priority: Priority,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: Extent::new(1280, 720),
            enable_validation: cfg!(debug_assertions),
            enable_raytracing: false,
            max_frames_in_flight: 3,
            thread_pool: ThreadPoolConfig::default(),
            priority: Priority::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_one_entry_per_subsystem() {
        let config = EngineConfig::default();
        assert_eq!(config.thread_pool.subsystems.len(), Subsystem::ALL.len());
    }
}
