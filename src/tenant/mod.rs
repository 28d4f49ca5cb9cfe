// Tenant resolution
//
// The edge layer derives the tenant slug from the storefront subdomain and
// forwards it in a routing header. Resolution here only extracts and shapes
// the slug; the tenant row is loaded later by the order service.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::{TenantRepository, TenantStore};

use axum::http::HeaderMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ServiceError;

pub const TENANT_MISSING_MESSAGE: &str = "Restaurant non identifié";

/// Opaque tenant slug taken from the routing header, not yet checked against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("static slug pattern is valid")
    })
}

/// Extract the tenant slug from the routing header
///
/// Fails closed: an absent, empty or malformed header is a validation error
/// with a fixed message.
pub fn resolve_tenant(headers: &HeaderMap, header_name: &str) -> Result<TenantSlug, ServiceError> {
    let raw = headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if raw.is_empty() || !slug_pattern().is_match(&raw) {
        tracing::debug!("Rejected request without usable tenant header '{}'", header_name);
        return Err(ServiceError::validation(TENANT_MISSING_MESSAGE));
    }

    Ok(TenantSlug(raw))
}
