//! Administrative license lifecycle: create, list, inspect, status flips,
//! field updates, and deletion.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::domain::{is_valid_domain, normalize_domain};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{
    CreateLicenseBody, License, LicenseSource, LicenseStats, LicenseStatus, LicenseType,
    NewLicense, UpdateLicenseBody,
};
use crate::util::{generate_license_key, is_valid_email};

/// Validate a creation request and hand a `NewLicense` to the store.
/// Shared by the create endpoint, the webhook path, and the CLI.
pub fn build_new_license(
    body: CreateLicenseBody,
    key_prefix: &str,
    source: LicenseSource,
    now: i64,
) -> Result<NewLicense> {
    if !is_valid_email(&body.email) {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let domain = normalize_domain(&body.domain);
    if !is_valid_domain(&domain) {
        return Err(AppError::BadRequest("Invalid domain format".into()));
    }

    if let Some(expires_at) = body.expires_at
        && expires_at <= now
    {
        return Err(AppError::BadRequest("expiresAt must be in the future".into()));
    }

    let key = match body.custom_key {
        Some(key) if !key.trim().is_empty() => key.trim().to_string(),
        _ => generate_license_key(key_prefix, body.license_type),
    };

    Ok(NewLicense {
        key,
        license_type: body.license_type,
        email: body.email,
        domain,
        expires_at: body.expires_at,
        metadata: body.metadata.unwrap_or_default(),
        source,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLicense {
    pub key: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub email: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateLicenseResponse {
    pub success: bool,
    pub license: CreatedLicense,
}

pub async fn create_license(
    State(state): State<AppState>,
    Json(body): Json<CreateLicenseBody>,
) -> Result<(StatusCode, Json<CreateLicenseResponse>)> {
    let input = build_new_license(
        body,
        &state.config.license_key_prefix,
        LicenseSource::Api,
        queries::now(),
    )?;

    let conn = state.db.get()?;
    let license = queries::create_license(&conn, &input)?;

    tracing::info!(key = %license.key, domain = %license.domain, "license created");

    Ok((
        StatusCode::CREATED,
        Json(CreateLicenseResponse {
            success: true,
            license: CreatedLicense {
                key: license.key,
                license_type: license.license_type,
                email: license.email,
                domain: license.domain,
                expires_at: license.expires_at,
            },
        }),
    ))
}

pub async fn license_stats(State(state): State<AppState>) -> Result<Json<LicenseStats>> {
    let conn = state.db.get()?;
    Ok(Json(queries::license_stats(&conn)?))
}

#[derive(Debug, Deserialize)]
pub struct ListLicensesQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
}

pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<ListLicensesQuery>,
) -> Result<Json<Vec<License>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let conn = state.db.get()?;
    Ok(Json(queries::list_licenses(&conn, limit, offset, search)?))
}

#[derive(Debug, Deserialize)]
pub struct KeyPath {
    pub key: String,
}

pub async fn get_license(
    State(state): State<AppState>,
    Path(path): Path<KeyPath>,
) -> Result<Json<License>> {
    let conn = state.db.get()?;
    let license = queries::get_license_by_key(&conn, &path.key)?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;
    Ok(Json(license))
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub(crate) fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

pub async fn activate_license(
    State(state): State<AppState>,
    Path(path): Path<KeyPath>,
) -> Result<Json<SuccessResponse>> {
    set_status(&state, &path.key, LicenseStatus::Active).await
}

pub async fn deactivate_license(
    State(state): State<AppState>,
    Path(path): Path<KeyPath>,
) -> Result<Json<SuccessResponse>> {
    set_status(&state, &path.key, LicenseStatus::Inactive).await
}

/// Idempotent status flip: setting an already-held status succeeds.
async fn set_status(
    state: &AppState,
    key: &str,
    status: LicenseStatus,
) -> Result<Json<SuccessResponse>> {
    let conn = state.db.get()?;
    let license = queries::get_license_by_key(&conn, key)?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    queries::update_license_status(&conn, &license.id, status)?;
    tracing::info!(key = %license.key, status = status.as_ref(), "license status changed");
    Ok(SuccessResponse::ok())
}

pub async fn update_license(
    State(state): State<AppState>,
    Path(path): Path<KeyPath>,
    Json(body): Json<UpdateLicenseBody>,
) -> Result<Json<SuccessResponse>> {
    let conn = state.db.get()?;
    let license = queries::get_license_by_key(&conn, &path.key)?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    // Validation halts at the first failing check; nothing is persisted
    // until every supplied field has passed.
    if let Some(ref email) = body.email
        && !is_valid_email(email)
    {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let domain = match body.domain.as_deref() {
        Some(raw) => {
            let normalized = normalize_domain(raw);
            if !is_valid_domain(&normalized) {
                return Err(AppError::BadRequest("Invalid domain format".into()));
            }
            Some(normalized)
        }
        None => None,
    };

    queries::update_license_fields(&conn, &license.id, body.email.as_deref(), domain.as_deref())?;
    Ok(SuccessResponse::ok())
}

pub async fn delete_license(
    State(state): State<AppState>,
    Path(path): Path<KeyPath>,
) -> Result<Json<SuccessResponse>> {
    let conn = state.db.get()?;
    let license = queries::get_license_by_key(&conn, &path.key)?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    if license.status == LicenseStatus::Active {
        return Err(AppError::Conflict(
            "Cannot delete active license. Please deactivate it first.".into(),
        ));
    }

    queries::delete_license(&conn, &license.id)?;
    tracing::info!(key = %license.key, "license deleted");
    Ok(SuccessResponse::ok())
}
