use serde::{Deserialize, Serialize};

use crate::errors::{MetabaseError, MetabaseResult};

/// Static description of one capability, as advertised to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Loads the capability catalog from `tools.json`, embedded at compile time.
/// Dispatch never consults it; it only feeds the "list capabilities" path.
pub fn list_capabilities() -> MetabaseResult<Vec<CapabilityDescriptor>> {
    let json = include_str!("tools.json");
    serde_json::from_str(json)
        .map_err(|e| MetabaseError::Config(format!("Failed to parse capability catalog: {e}")))
}
