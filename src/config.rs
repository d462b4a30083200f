// Store configuration: an explicit options record plus a fluent builder,
// replacing the global-flags-at-process-start pattern the design notes
// call out for removal. No process-wide state; everything flows through
// `StoreOptions` into `Store::new`.

use std::time::Duration;

pub const DEFAULT_INITIAL_SIZE: u64 = 32 * 1024 * 1024; // 32 MiB
pub const DEFAULT_MAX_SIZE: u64 = 512 * 1024 * 1024; // 512 MiB
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub initial_size: u64,
    pub max_size: u64,
    pub sync_interval: Duration,
    pub debug: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_INITIAL_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            debug: false,
        }
    }
}

/// Fluent builder for `StoreOptions`.
#[derive(Debug, Clone, Default)]
pub struct StoreOptionsBuilder {
    opts: StoreOptions,
}

impl StoreOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_size(mut self, bytes: u64) -> Self {
        self.opts.initial_size = bytes;
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.opts.max_size = bytes;
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.opts.sync_interval = interval;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.opts.debug = debug;
        self
    }

    pub fn build(self) -> StoreOptions {
        self.opts
    }
}
