use crate::hasher::DEFAULT_CHECKSUM_WINDOW;

/// Tunables for an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Longest folder or keyword parent chain walked before it is reported as a cycle.
    pub max_hierarchy_depth: usize,
    /// Bytes read from each end of a master by the default fingerprint.
    pub checksum_window: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: 64,
            checksum_window: DEFAULT_CHECKSUM_WINDOW,
        }
    }
}
