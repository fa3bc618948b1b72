//! Tenant resolution
//!
//! A dialed number is resolved through a chain of directory tiers: the tenant
//! config service, a local YAML directory, then the built-in demo table. The
//! whole chain runs under one deadline. Anything unresolved, failed or late
//! gets the configured default tenant, so resolution never fails a call.

use async_trait::async_trait;
use media_gateway_config::{FallbackTenantConfig, TenantsConfig};
use media_gateway_core::{
    Error, Result, SynthesisEngine, TenantProfile, TenantResolver, DEFAULT_TENANT_ID,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::AgentError;

/// Tenant entry as served by the directory service or stored in YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantRecord {
    #[serde(default, alias = "tenant_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub did: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub polly_voice_id: Option<String>,
    #[serde(default)]
    pub polly_engine: Option<String>,
}

impl TenantRecord {
    /// Build a profile, filling blanks from `fallback`. `key` names the
    /// tenant when the record carries no name of its own.
    pub fn into_profile(self, key: Option<&str>, fallback: &TenantProfile) -> TenantProfile {
        let tenant_id = non_empty(self.name)
            .or_else(|| key.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());
        let engine = non_empty(self.polly_engine)
            .and_then(|raw| match raw.parse::<SynthesisEngine>() {
                Ok(engine) => Some(engine),
                Err(e) => {
                    tracing::warn!(tenant = %tenant_id, error = %e, "Unknown synthesis engine, using default");
                    None
                }
            })
            .unwrap_or(fallback.engine);

        TenantProfile {
            display_name: non_empty(self.display_name)
                .unwrap_or_else(|| fallback.display_name.clone()),
            voice_id: non_empty(self.polly_voice_id).unwrap_or_else(|| fallback.voice_id.clone()),
            greeting: non_empty(self.greeting).unwrap_or_else(|| fallback.greeting.clone()),
            engine,
            tenant_id,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Default tenant built from configuration
pub fn fallback_profile(config: &FallbackTenantConfig) -> TenantProfile {
    let defaults = TenantProfile::fallback();
    TenantProfile {
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        display_name: config.display_name.clone(),
        voice_id: config.voice_id.clone(),
        engine: config.engine.parse().unwrap_or(defaults.engine),
        greeting: config.greeting.clone(),
    }
}

/// Tenant config service client
pub struct HttpTenantResolver {
    client: Client,
    base_url: String,
    fallback: TenantProfile,
}

impl HttpTenantResolver {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        fallback: TenantProfile,
    ) -> std::result::Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Tenant(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            fallback,
        })
    }
}

#[async_trait]
impl TenantResolver for HttpTenantResolver {
    async fn resolve(&self, dialed_number: &str) -> Result<Option<TenantProfile>> {
        let response = self
            .client
            .get(format!("{}/v1/tenants/resolve", self.base_url))
            .query(&[("did", dialed_number)])
            .send()
            .await
            .map_err(|e| Error::Tenant(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Tenant(format!("HTTP {} resolving {}", status, dialed_number)));
        }

        let record: TenantRecord = response
            .json()
            .await
            .map_err(|e| Error::Tenant(format!("invalid tenant payload: {}", e)))?;
        Ok(Some(record.into_profile(None, &self.fallback)))
    }

    fn name(&self) -> &str {
        "service"
    }
}

#[derive(Debug, Deserialize)]
struct TenantFile {
    #[serde(default)]
    tenants: BTreeMap<String, TenantRecord>,
}

/// Static number-to-tenant table
pub struct StaticTenantDirectory {
    name: &'static str,
    by_did: HashMap<String, TenantProfile>,
}

impl StaticTenantDirectory {
    /// Parse a YAML directory: `tenants: {key: {did, display_name, ...}}`
    pub fn from_yaml(raw: &str, fallback: &TenantProfile) -> std::result::Result<Self, AgentError> {
        let file: TenantFile = serde_yaml::from_str(raw)
            .map_err(|e| AgentError::Tenant(format!("invalid tenant directory: {}", e)))?;

        let mut by_did = HashMap::new();
        for (key, record) in file.tenants {
            let Some(did) = non_empty(record.did.clone()) else {
                tracing::warn!(tenant = %key, "Tenant entry without a did, skipping");
                continue;
            };
            by_did.insert(did, record.into_profile(Some(&key), fallback));
        }
        Ok(Self {
            name: "file",
            by_did,
        })
    }

    pub fn load(path: impl AsRef<Path>, fallback: &TenantProfile) -> std::result::Result<Self, AgentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Tenant(format!("cannot read {}: {}", path.display(), e))
        })?;
        let directory = Self::from_yaml(&raw, fallback)?;
        tracing::info!(path = %path.display(), tenants = directory.len(), "Loaded tenant directory");
        Ok(directory)
    }

    /// Demo numbers served without any external directory
    pub fn builtin() -> Self {
        let entries = [
            (
                "1001",
                "downtown-medical",
                "Downtown Medical Center",
                "Joanna",
                "Hello! Thank you for calling Downtown Medical Center. How can I help you today?",
            ),
            (
                "1002",
                "westside-family",
                "Westside Family Practice",
                "Matthew",
                "Hi there! You've reached Westside Family Practice. How may I assist you today?",
            ),
            (
                "1003",
                "pediatric-care",
                "Pediatric Care Clinic",
                "Salli",
                "Welcome to Pediatric Care Clinic! We're here to help with your child's health needs.",
            ),
        ];

        let by_did = entries
            .into_iter()
            .map(|(did, id, display, voice, greeting)| {
                let profile = TenantProfile {
                    tenant_id: id.to_string(),
                    display_name: display.to_string(),
                    voice_id: voice.to_string(),
                    engine: SynthesisEngine::Neural,
                    greeting: greeting.to_string(),
                };
                (did.to_string(), profile)
            })
            .collect();

        Self {
            name: "builtin",
            by_did,
        }
    }

    pub fn len(&self) -> usize {
        self.by_did.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_did.is_empty()
    }
}

#[async_trait]
impl TenantResolver for StaticTenantDirectory {
    async fn resolve(&self, dialed_number: &str) -> Result<Option<TenantProfile>> {
        Ok(self.by_did.get(dialed_number).cloned())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Ordered resolver chain with a shared deadline and a default tenant
pub struct TenantDirectory {
    tiers: Vec<Arc<dyn TenantResolver>>,
    fallback: TenantProfile,
    timeout: Duration,
}

impl TenantDirectory {
    pub fn new(tiers: Vec<Arc<dyn TenantResolver>>, fallback: TenantProfile, timeout: Duration) -> Self {
        Self {
            tiers,
            fallback,
            timeout,
        }
    }

    /// Assemble the configured tiers
    pub fn from_config(config: &TenantsConfig, timeout: Duration) -> std::result::Result<Self, AgentError> {
        let fallback = fallback_profile(&config.fallback);
        let mut tiers: Vec<Arc<dyn TenantResolver>> = Vec::new();

        if let Some(url) = config.service_url.as_deref().filter(|u| !u.is_empty()) {
            tiers.push(Arc::new(HttpTenantResolver::new(url, timeout, fallback.clone())?));
        }
        if let Some(path) = config.directory_path.as_deref().filter(|p| !p.is_empty()) {
            match StaticTenantDirectory::load(path, &fallback) {
                Ok(directory) => tiers.push(Arc::new(directory)),
                Err(e) => tracing::warn!(path = %path, error = %e, "Tenant directory unavailable"),
            }
        }
        if config.builtin_directory {
            tiers.push(Arc::new(StaticTenantDirectory::builtin()));
        }

        tracing::info!(
            tiers = ?tiers.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            default = %fallback.display_name,
            "Tenant directory ready"
        );
        Ok(Self::new(tiers, fallback, timeout))
    }

    pub fn fallback(&self) -> &TenantProfile {
        &self.fallback
    }

    /// Resolve `dialed_number`. Never fails.
    pub async fn resolve(&self, dialed_number: &str) -> TenantProfile {
        if dialed_number.trim().is_empty() {
            return self.fallback.clone();
        }

        match tokio::time::timeout(self.timeout, self.resolve_tiers(dialed_number)).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::info!(did = %dialed_number, "No tenant for number, using default");
                self.fallback.clone()
            }
            Err(_) => {
                tracing::warn!(
                    did = %dialed_number,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Tenant resolution timed out, using default"
                );
                self.fallback.clone()
            }
        }
    }

    async fn resolve_tiers(&self, dialed_number: &str) -> Option<TenantProfile> {
        for tier in &self.tiers {
            match tier.resolve(dialed_number).await {
                Ok(Some(profile)) => {
                    tracing::debug!(did = %dialed_number, tier = tier.name(), tenant = %profile.tenant_id, "Tenant resolved");
                    return Some(profile);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(did = %dialed_number, tier = tier.name(), error = %e, "Tenant tier failed");
                }
            }
        }
        None
    }
}
