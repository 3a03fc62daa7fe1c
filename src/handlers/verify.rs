//! License verification: the one endpoint customer sites call at runtime.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::domain::{extract_domain_from_headers, normalize_domain};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{License, LicenseStatus, LicenseType};

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub key: String,
    /// Optional explicit domain; falls back to request headers when absent
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn invalid(reason: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(VerifyResponse {
            valid: false,
            license_type: LicenseType::Free,
            error: Some(reason.into()),
        }),
    )
        .into_response()
}

/// Check one license record against the request domain and the clock.
/// Pure: the caller looks the record up and applies the usage side effect.
pub(crate) fn check_license(
    license: &License,
    request_domain: &str,
    now: i64,
) -> std::result::Result<(), String> {
    if license.status != LicenseStatus::Active {
        return Err("License is not active".to_string());
    }

    if let Some(expires_at) = license.expires_at
        && expires_at < now
    {
        return Err("License expired".to_string());
    }

    let license_domain = normalize_domain(&license.domain);
    let request_domain = normalize_domain(request_domain);
    if license_domain != request_domain {
        return Err(format!(
            "Domain mismatch: license domain=\"{license_domain}\", request domain=\"{request_domain}\""
        ));
    }

    Ok(())
}

pub async fn verify_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyBody>,
) -> Result<Response> {
    let domain = body
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(normalize_domain)
        .or_else(|| extract_domain_from_headers(&headers));

    let Some(domain) = domain else {
        return Ok(invalid(
            "Unable to determine domain from request. Please ensure Host, Origin, or Referer header is present.",
        ));
    };

    let conn = state.db.get()?;

    let Some(license) = queries::get_license_by_key(&conn, &body.key)? else {
        return Ok(invalid("Invalid license key"));
    };

    if let Err(reason) = check_license(&license, &domain, queries::now()) {
        return Ok(invalid(reason));
    }

    // Best-effort telemetry: a failed counter bump must not downgrade a
    // verification that already passed every check.
    if let Err(err) = queries::record_usage(&conn, &license.id) {
        tracing::warn!(
            key = %license.key,
            "usage counter update failed after successful verification: {err}"
        );
    }

    Ok(axum::Json(VerifyResponse {
        valid: true,
        license_type: license.license_type,
        error: None,
    })
    .into_response())
}
