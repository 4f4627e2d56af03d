//! Construction options for projection hierarchies.

use serde::{Deserialize, Serialize};

/// Options shared by every node of one hierarchy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Drop emissions equal to the previous one at the same path. For state
    /// sources this also turns writes of an unchanged leaf into no-ops.
    pub distinct: bool,
}

impl ProxyOptions {
    pub fn distinct() -> Self {
        Self { distinct: true }
    }

    /// Parse options from a YAML document
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}
