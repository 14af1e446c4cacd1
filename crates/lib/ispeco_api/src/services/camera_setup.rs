//! Camera installation records.
//!
//! Access follows the camera: anyone who may read the camera's metadata may
//! read its setup, only the owner may write or remove it.

use chrono::{NaiveDate, NaiveTime};
use ispeco_core::access::check_camera;
use ispeco_core::access::policy::Operation;
use ispeco_core::cameras::queries;
use ispeco_core::models::setup::SetupFields;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{CameraSetupRequest, CameraSetupResponse};

const SETUP_NOT_FOUND: &str = "Camera setup not found";

const ADDRESS_MAX_LEN: usize = 255;
const CITY_MAX_LEN: usize = 50;
const ZIP_CODE_MAX_LEN: usize = 10;
const STATE_PROVINCE_MAX_LEN: usize = 50;
const COUNTRY_MAX_LEN: usize = 50;

fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
) -> Option<String> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        errors.add(field, "This field is required.");
        return None;
    };
    optional_text(errors, field, Some(value), max_len)
}

fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if let Some(max) = max_len
        && value.chars().count() > max
    {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
        return None;
    }
    Some(value.to_string())
}

fn parse_date(errors: &mut FieldErrors, value: Option<&str>) -> Option<NaiveDate> {
    let raw = required_text(errors, "date", value, None)?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("date", "Date has wrong format. Use YYYY-MM-DD.");
            None
        }
    }
}

fn parse_time(errors: &mut FieldErrors, value: Option<&str>) -> Option<NaiveTime> {
    let raw = required_text(errors, "time", value, None)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(|_| errors.add("time", "Time has wrong format. Use hh:mm[:ss]."))
        .ok()
}

/// Check every field and report all failures at once.
fn validate_setup(req: &CameraSetupRequest) -> AppResult<SetupFields> {
    let mut errors = FieldErrors::default();
    let address_line_1 = required_text(
        &mut errors,
        "address_line_1",
        req.address_line_1.as_deref(),
        Some(ADDRESS_MAX_LEN),
    );
    let address_line_2 = optional_text(
        &mut errors,
        "address_line_2",
        req.address_line_2.as_deref(),
        Some(ADDRESS_MAX_LEN),
    );
    let city = required_text(&mut errors, "city", req.city.as_deref(), Some(CITY_MAX_LEN));
    let zip_code = required_text(
        &mut errors,
        "zip_code",
        req.zip_code.as_deref(),
        Some(ZIP_CODE_MAX_LEN),
    );
    let state_province = required_text(
        &mut errors,
        "state_province",
        req.state_province.as_deref(),
        Some(STATE_PROVINCE_MAX_LEN),
    );
    let country = required_text(
        &mut errors,
        "country",
        req.country.as_deref(),
        Some(COUNTRY_MAX_LEN),
    );
    let installed_on = parse_date(&mut errors, req.date.as_deref());
    let installed_at = parse_time(&mut errors, req.time.as_deref());
    let installation_notes = required_text(
        &mut errors,
        "installation_notes",
        req.installation_notes.as_deref(),
        None,
    );

    let (
        Some(address_line_1),
        Some(city),
        Some(zip_code),
        Some(state_province),
        Some(country),
        Some(installed_on),
        Some(installed_at),
        Some(installation_notes),
    ) = (
        address_line_1,
        city,
        zip_code,
        state_province,
        country,
        installed_on,
        installed_at,
        installation_notes,
    )
    else {
        return Err(errors.into());
    };
    errors.finish()?;

    Ok(SetupFields {
        address_line_1,
        address_line_2,
        city,
        zip_code,
        state_province,
        country,
        installed_on,
        installed_at,
        installation_notes,
    })
}

pub async fn get_setup(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
) -> AppResult<CameraSetupResponse> {
    check_camera(state.store.as_ref(), user_id, camera_id, Operation::ReadMetadata).await?;
    let setup = queries::get_setup(&state.pool, camera_id)
        .await?
        .ok_or_else(|| AppError::NotFound(SETUP_NOT_FOUND.into()))?;
    Ok(setup.into())
}

/// Create or replace the installation record. Owner only.
pub async fn put_setup(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
    req: &CameraSetupRequest,
) -> AppResult<CameraSetupResponse> {
    check_camera(state.store.as_ref(), user_id, camera_id, Operation::Mutate).await?;
    let fields = validate_setup(req)?;
    let setup = queries::upsert_setup(&state.pool, camera_id, &fields).await?;
    info!(camera_id = %camera_id, "camera setup recorded");
    Ok(setup.into())
}

pub async fn delete_setup(state: &AppState, user_id: Uuid, camera_id: Uuid) -> AppResult<()> {
    check_camera(state.store.as_ref(), user_id, camera_id, Operation::Mutate).await?;
    if !queries::delete_setup(&state.pool, camera_id).await? {
        return Err(AppError::NotFound(SETUP_NOT_FOUND.into()));
    }
    info!(camera_id = %camera_id, "camera setup removed");
    Ok(())
}
