use serde::{Deserialize, Serialize};

/// Tunables of the editing engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Chains kept on the undo stack (0 = unlimited)
    pub undo_limit: usize,

    /// Commands replayed per tick; chains up to this length replay at once
    pub chunk_size: usize,

    /// Depth bound of the reference cycle search
    pub cycle_depth_limit: usize,

    /// Reference expansion depth during variant resolution
    pub resolve_recursion_limit: usize,

    /// Rounds of referenced-preset collection on cross-document paste
    pub reference_search_limit: usize,

    /// Resolve every `reset` preset ahead of the requested one
    pub collect_reset: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_limit: 50,
            chunk_size: 8,
            cycle_depth_limit: 10,
            resolve_recursion_limit: 3,
            reference_search_limit: 10,
            collect_reset: false,
        }
    }
}
