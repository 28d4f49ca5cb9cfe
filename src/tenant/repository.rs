use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::tenant::Tenant;

/// Read access to tenant rows
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError>;
}

/// Repository for tenant operations
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    /// Create a new TenantRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, slug, name, currency, enable_tax, tax_rate,
                   enable_service_charge, service_charge_rate,
                   subscription_plan, subscription_status, trial_ends_at
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }
}
