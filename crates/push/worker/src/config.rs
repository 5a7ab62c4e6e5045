//! Worker configuration.

/// Settings for one dispatch worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerConfig {
    /// Provider/project identifier used to tag responses and logs.
    pub project_id: String,
    /// Concurrent requests. Values below 1 are clamped to 1.
    #[serde(default = "default_threads")]
    pub threads: i32,
    /// Skip the transport and report success for every device.
    #[serde(default)]
    pub nop_mode: bool,
}

fn default_threads() -> i32 {
    1
}

impl WorkerConfig {
    /// Create a config with a single permit.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            threads: default_threads(),
            nop_mode: false,
        }
    }

    /// Set the pool size.
    pub fn with_threads(mut self, threads: i32) -> Self {
        self.threads = threads;
        self
    }

    /// Enable no-op mode.
    pub fn with_nop_mode(mut self, nop_mode: bool) -> Self {
        self.nop_mode = nop_mode;
        self
    }

    /// Pool size after clamping.
    pub fn pool_size(&self) -> u32 {
        u32::try_from(self.threads).unwrap_or(0).max(1)
    }
}
