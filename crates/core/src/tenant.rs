//! Tenant context resolved from the dialed number

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tenant id used when the directory cannot resolve a number
pub const DEFAULT_TENANT_ID: &str = "default";

/// Synthesis engine tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisEngine {
    Standard,
    #[default]
    Neural,
}

impl SynthesisEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisEngine::Standard => "standard",
            SynthesisEngine::Neural => "neural",
        }
    }
}

impl fmt::Display for SynthesisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynthesisEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SynthesisEngine::Standard),
            "neural" => Ok(SynthesisEngine::Neural),
            other => Err(format!("unknown synthesis engine: {}", other)),
        }
    }
}

/// Per-call tenant context. Immutable once the call is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub tenant_id: String,
    pub display_name: String,
    pub voice_id: String,
    pub engine: SynthesisEngine,
    pub greeting: String,
}

impl TenantProfile {
    /// Profile used when no directory tier knows the number
    pub fn fallback() -> Self {
        Self {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            display_name: "Medical Clinic".to_string(),
            voice_id: "Joanna".to_string(),
            engine: SynthesisEngine::Neural,
            greeting: "Hello! How can I help you today?".to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.tenant_id == DEFAULT_TENANT_ID
    }
}

impl Default for TenantProfile {
    fn default() -> Self {
        Self::fallback()
    }
}
