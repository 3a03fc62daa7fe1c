//! Sale-notification webhook: maps an external payment event into a
//! license creation.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{CreateLicenseBody, LicenseSource, LicenseType, WebhookPayload};

use super::licenses::build_new_license;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub license_key: String,
}

pub async fn process_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<(StatusCode, Json<WebhookResponse>)> {
    let mut metadata = payload.metadata.unwrap_or_default();
    metadata.insert("source".to_string(), Value::String("webhook".to_string()));
    if let Some(sale_id) = payload.sale_id {
        metadata.insert("saleId".to_string(), Value::String(sale_id));
    }

    let body = CreateLicenseBody {
        email: payload.email,
        license_type: payload.license_type.unwrap_or(LicenseType::Pro),
        // Sales without a site (e.g. pre-launch purchases) bind to the
        // loopback token until the buyer registers a real domain.
        domain: payload.domain.unwrap_or_else(|| "localhost".to_string()),
        custom_key: None,
        expires_at: None,
        metadata: Some(metadata),
    };

    // Failures from create (bad email, domain conflict) propagate unchanged;
    // webhook-issued licenses get no special treatment.
    let input = build_new_license(
        body,
        &state.config.license_key_prefix,
        LicenseSource::Webhook,
        queries::now(),
    )?;

    let conn = state.db.get()?;
    let license = queries::create_license(&conn, &input)?;

    tracing::info!(key = %license.key, domain = %license.domain, "license issued via webhook");

    Ok((
        StatusCode::CREATED,
        Json(WebhookResponse {
            success: true,
            license_key: license.key,
        }),
    ))
}
