//! Per-replica document settings.

use serde::{Deserialize, Serialize};

/// Default for [`DocumentConfig::pending_warn_threshold`].
pub const DEFAULT_PENDING_WARN_THRESHOLD: usize = 1024;

/// Tunables for a [`Document`](super::Document).
///
/// None of these change which state replicas converge to. Missing fields
/// take their defaults when deserializing.
///
/// ```
/// use replidoc::DocumentConfig;
///
/// let config: DocumentConfig = serde_json::from_str(r#"{"record_root_deps": true}"#)?;
/// assert!(config.record_root_deps);
/// assert_eq!(config.pending_warn_threshold, 1024);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Log a warning whenever the pending buffer grows past this many
    /// operations. Buffered operations are never dropped.
    pub pending_warn_threshold: usize,
    /// Also record every applied operation id in the root node's deps.
    pub record_root_deps: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            pending_warn_threshold: DEFAULT_PENDING_WARN_THRESHOLD,
            record_root_deps: false,
        }
    }
}
