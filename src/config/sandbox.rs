use serde::Deserialize;

/// Resource limits applied to every callback script.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,
    #[serde(default = "default_max_expr_depth")]
    pub max_expr_depth: usize,
    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,
    #[serde(default = "default_max_collection_size")]
    pub max_array_size: usize,
    #[serde(default = "default_max_collection_size")]
    pub max_map_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_call_levels: default_max_call_levels(),
            max_expr_depth: default_max_expr_depth(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_collection_size(),
            max_map_size: default_max_collection_size(),
        }
    }
}

fn default_max_operations() -> u64 {
    10_000
}

fn default_max_call_levels() -> usize {
    10
}

fn default_max_expr_depth() -> usize {
    32
}

// 4MB
fn default_max_string_size() -> usize {
    4_096_000
}

fn default_max_collection_size() -> usize {
    10_000
}
