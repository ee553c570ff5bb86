//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default timeout for a single diagram render (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between exit checks on a running `mmdc` process.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Executable name looked up on `PATH` when none is configured.
pub const MMDC_PROGRAM: &str = "mmdc";

/// Background colour passed to `mmdc`.
pub const BACKGROUND: &str = "transparent";
