use std::env;

const ENV_INITIAL_CAPACITY: &str = "LABELED_FRAME_INITIAL_CAPACITY";
const ENV_PARALLEL_THRESHOLD: &str = "LABELED_FRAME_PARALLEL_THRESHOLD";
const ENV_PARALLEL_SORT: &str = "LABELED_FRAME_PARALLEL_SORT";

/// Engine-wide tuning knobs, passed explicitly to the [`IndexFactory`] and
/// to each [`Content`].
///
/// [`IndexFactory`]: crate::frame::index_factory::IndexFactory
/// [`Content`]: crate::frame::content::Content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Capacity given to an index created without keys
    pub initial_capacity: usize,
    /// Fork/join partitions at or below this many ordinals run sequentially
    pub parallel_threshold: usize,
    /// Whether sorts requested through the config run on the rayon pool
    pub parallel_sort: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            initial_capacity: 16,
            parallel_threshold: 10_000,
            parallel_sort: true,
        }
    }
}

impl FrameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity.max(1);
        self
    }

    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    pub fn parallel_sort(mut self, parallel: bool) -> Self {
        self.parallel_sort = parallel;
        self
    }

    /// Defaults overridden by `LABELED_FRAME_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = read_env::<usize>(ENV_INITIAL_CAPACITY) {
            config = config.initial_capacity(v);
        }
        if let Some(v) = read_env::<usize>(ENV_PARALLEL_THRESHOLD) {
            config = config.parallel_threshold(v);
        }
        if let Some(v) = read_env::<bool>(ENV_PARALLEL_SORT) {
            config = config.parallel_sort(v);
        }
        config
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
