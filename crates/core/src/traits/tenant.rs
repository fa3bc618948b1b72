//! Tenant directory trait

use crate::tenant::TenantProfile;
use crate::Result;
use async_trait::async_trait;

/// Maps a dialed number to a tenant profile
#[async_trait]
pub trait TenantResolver: Send + Sync + 'static {
    /// `Ok(None)` when the directory does not know the number
    async fn resolve(&self, dialed_number: &str) -> Result<Option<TenantProfile>>;

    fn name(&self) -> &str;
}
