/// Runtime-level configuration (worker pool sizing).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads in the default scheduler.
    ///
    /// Thread-based receives pin a worker while parked, so size the pool
    /// for the number of concurrently blocking actors; event-based actors
    /// only hold a worker for the duration of a reaction.
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(4),
        }
    }
}

impl RuntimeConfig {
    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_workers() {
        let config = RuntimeConfig::default();
        assert!(config.workers >= 4);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::default().with_workers(8);
        assert_eq!(config.workers, 8);
    }
}
