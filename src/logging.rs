//! Logger installation for binaries and tests.
//!
//! The library only emits through the `log` facade. Applications that do not
//! bring their own logger can call [`init_logging`].

use env_logger::{Builder, Env};

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "info";

/// Installs `env_logger` once. `RUST_LOG` wins over `filter`.
///
/// Returns false if a logger was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    Builder::from_env(Env::default().default_filter_or(filter.unwrap_or(DEFAULT_FILTER)))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
