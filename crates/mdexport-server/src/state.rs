//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use crate::tools::ToolRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Conversion tools.
    pub(crate) registry: Arc<ToolRegistry>,
    /// Application version reported by `initialize` and `/health/`.
    pub(crate) version: String,
}
