//! Camera registration, metadata and credential retrieval.
//!
//! Plaintext credentials only exist inside these functions: they are
//! encrypted before a row is written and decrypted only for the owner's
//! secret endpoints.

use ispeco_core::access::check_camera;
use ispeco_core::access::policy::Operation;
use ispeco_core::cameras::queries;
use ispeco_core::models::camera::{
    Brand, CameraChanges, CameraType, Environment, IndustryType, NewCamera, Resolution,
    SecretChange, default_camera_name,
};
use ispeco_core::secrets::{CodecError, SecretCodec};
use ispeco_core::stream::source::{STREAM_URL_SCHEMES, is_allowed_stream_url};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    CameraPasswordResponse, CameraResponse, CameraUrlResponse, CreateCameraRequest,
    UpdateCameraRequest,
};

const NAME_MAX_LEN: usize = 100;

/// A supplied secret, or `None` when absent or blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn encrypt_optional(
    codec: Result<&SecretCodec, CodecError>,
    value: Option<&str>,
) -> AppResult<Option<Vec<u8>>> {
    match non_blank(value) {
        Some(plaintext) => Ok(Some(codec?.encrypt(plaintext)?)),
        None => Ok(None),
    }
}

/// An omitted secret is kept; a blank one clears the stored value.
fn secret_change(
    codec: Result<&SecretCodec, CodecError>,
    value: Option<&str>,
) -> AppResult<SecretChange> {
    match value {
        None => Ok(SecretChange::Keep),
        Some(v) => Ok(match encrypt_optional(codec, Some(v))? {
            Some(ciphertext) => SecretChange::Set(ciphertext),
            None => SecretChange::Clear,
        }),
    }
}

fn check_stream_url(errors: &mut FieldErrors, stream_url: Option<&str>) {
    if let Some(address) = non_blank(stream_url)
        && !is_allowed_stream_url(address.trim())
    {
        errors.add(
            "stream_url",
            format!("Enter a valid URL ({}).", STREAM_URL_SCHEMES.join(", ")),
        );
    }
}

fn check_name(errors: &mut FieldErrors, name: Option<&str>) {
    if name.is_some_and(|n| n.chars().count() > NAME_MAX_LEN) {
        errors.add(
            "name",
            format!("Ensure this field has no more than {NAME_MAX_LEN} characters."),
        );
    }
}

/// Register a camera owned by `owner_id`.
pub async fn create_camera(
    state: &AppState,
    owner_id: Uuid,
    req: &CreateCameraRequest,
) -> AppResult<CameraResponse> {
    let mut errors = FieldErrors::default();
    check_name(&mut errors, req.name.as_deref());
    let camera_type = errors.choice::<CameraType>("camera_type", &req.camera_type);
    let industry_type = errors.choice::<IndustryType>("industry_type", &req.industry_type);
    let environment = errors.choice::<Environment>("environment", &req.environment);
    let resolution = errors.choice::<Resolution>("resolution", &req.resolution);
    let brand = errors.choice::<Brand>("brand", &req.brand);
    check_stream_url(&mut errors, req.stream_url.as_deref());

    let (Some(camera_type), Some(industry_type), Some(environment), Some(resolution), Some(brand)) =
        (camera_type, industry_type, environment, resolution, brand)
    else {
        return Err(errors.into());
    };
    errors.finish()?;

    let new_camera = NewCamera {
        owner_id,
        name: non_blank(req.name.as_deref())
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| default_camera_name(brand, camera_type)),
        camera_type,
        industry_type,
        environment,
        resolution,
        brand,
        encrypted_url: encrypt_optional(state.codec(), req.stream_url.as_deref().map(str::trim))?,
        encrypted_password: encrypt_optional(state.codec(), req.password.as_deref())?,
    };

    let camera = queries::insert_camera(&state.pool, &new_camera).await?;
    info!(camera_id = %camera.id, owner_id = %owner_id, "camera registered");
    Ok(CameraResponse::new(&camera, owner_id))
}

pub async fn list_cameras(state: &AppState, owner_id: Uuid) -> AppResult<Vec<CameraResponse>> {
    let cameras = queries::list_owned_cameras(&state.pool, owner_id).await?;
    Ok(cameras
        .iter()
        .map(|c| CameraResponse::new(c, owner_id))
        .collect())
}

/// Cameras other users have shared with `user_id`.
pub async fn list_shared_cameras(
    state: &AppState,
    user_id: Uuid,
) -> AppResult<Vec<CameraResponse>> {
    let cameras = queries::list_shared_cameras(&state.pool, user_id).await?;
    Ok(cameras
        .iter()
        .map(|c| CameraResponse::new(c, user_id))
        .collect())
}

pub async fn get_camera(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
) -> AppResult<CameraResponse> {
    let camera =
        check_camera(state.store.as_ref(), user_id, camera_id, Operation::ReadMetadata).await?;
    Ok(CameraResponse::new(&camera, user_id))
}

pub async fn update_camera(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
    req: &UpdateCameraRequest,
) -> AppResult<CameraResponse> {
    check_camera(state.store.as_ref(), user_id, camera_id, Operation::Mutate).await?;

    let changes = camera_changes(req)?;
    let changes = CameraChanges {
        encrypted_url: secret_change(state.codec(), req.stream_url.as_deref().map(str::trim))?,
        encrypted_password: secret_change(state.codec(), req.password.as_deref())?,
        ..changes
    };

    let camera = queries::update_camera(&state.pool, camera_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(ispeco_core::access::CAMERA_NOT_FOUND.into()))?;
    info!(camera_id = %camera.id, "camera updated");
    Ok(CameraResponse::new(&camera, user_id))
}

/// Validated metadata changes. Secrets are left as [`SecretChange::Keep`].
fn camera_changes(req: &UpdateCameraRequest) -> AppResult<CameraChanges> {
    let mut errors = FieldErrors::default();
    check_name(&mut errors, req.name.as_deref());
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.add("name", "This field may not be blank.");
    }
    check_stream_url(&mut errors, req.stream_url.as_deref());
    let changes = CameraChanges {
        name: req.name.as_deref().map(|n| n.trim().to_string()),
        camera_type: errors.optional_choice("camera_type", req.camera_type.as_deref()),
        industry_type: errors.optional_choice("industry_type", req.industry_type.as_deref()),
        environment: errors.optional_choice("environment", req.environment.as_deref()),
        resolution: errors.optional_choice("resolution", req.resolution.as_deref()),
        brand: errors.optional_choice("brand", req.brand.as_deref()),
        ..CameraChanges::default()
    };
    errors.finish()?;
    Ok(changes)
}

pub async fn delete_camera(state: &AppState, user_id: Uuid, camera_id: Uuid) -> AppResult<()> {
    check_camera(state.store.as_ref(), user_id, camera_id, Operation::Delete).await?;
    if !queries::delete_camera(&state.pool, camera_id).await? {
        return Err(AppError::NotFound(ispeco_core::access::CAMERA_NOT_FOUND.into()));
    }
    info!(camera_id = %camera_id, "camera deleted");
    Ok(())
}

/// Decrypted stream address. Owner only.
pub async fn camera_url(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
) -> AppResult<CameraUrlResponse> {
    let camera =
        check_camera(state.store.as_ref(), user_id, camera_id, Operation::ReadSecret).await?;
    let url = match camera.encrypted_url.as_deref() {
        Some(ciphertext) => Some(state.codec()?.decrypt(ciphertext)?),
        None => None,
    };
    Ok(CameraUrlResponse { url })
}

/// Decrypted camera password. Owner only.
pub async fn camera_password(
    state: &AppState,
    user_id: Uuid,
    camera_id: Uuid,
) -> AppResult<CameraPasswordResponse> {
    let camera =
        check_camera(state.store.as_ref(), user_id, camera_id, Operation::ReadSecret).await?;
    let password = match camera.encrypted_password.as_deref() {
        Some(ciphertext) => Some(state.codec()?.decrypt(ciphertext)?),
        None => None,
    };
    Ok(CameraPasswordResponse { password })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secrets_are_not_stored() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some("pa ss")), Some("pa ss"));
    }

    #[test]
    fn secrets_need_a_key_only_when_present() {
        assert!(matches!(encrypt_optional(Err(CodecError::KeyMissing), None), Ok(None)));
        assert!(matches!(
            encrypt_optional(Err(CodecError::KeyMissing), Some("rtsp://x/y")),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn encrypted_secret_round_trips() {
        let codec = SecretCodec::new("service-test").unwrap();
        let stored = encrypt_optional(Ok(&codec), Some("rtsp://x/y"))
            .unwrap()
            .unwrap();
        assert_eq!(codec.decrypt(&stored).unwrap(), "rtsp://x/y");
    }

    #[test]
    fn blank_secret_on_update_clears_it() {
        let codec = SecretCodec::new("service-test").unwrap();
        assert!(matches!(secret_change(Ok(&codec), None), Ok(SecretChange::Keep)));
        assert!(matches!(secret_change(Ok(&codec), Some("")), Ok(SecretChange::Clear)));
        assert!(matches!(
            secret_change(Err(CodecError::KeyMissing), Some("  ")),
            Ok(SecretChange::Clear)
        ));
        match secret_change(Ok(&codec), Some("hunter2")) {
            Ok(SecretChange::Set(ciphertext)) => {
                assert_eq!(codec.decrypt(&ciphertext).unwrap(), "hunter2");
            }
            _ => panic!("expected a replacement"),
        }
    }

    fn update(stream_url: Option<&str>) -> UpdateCameraRequest {
        UpdateCameraRequest {
            stream_url: stream_url.map(str::to_string),
            ..UpdateCameraRequest::default()
        }
    }

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::InvalidFields(fields) => fields.keys().cloned().collect(),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn update_rejects_non_network_stream_url() {
        for bad in ["file:///etc/passwd", "/dev/video0", "ftp://cam/x"] {
            let err = camera_changes(&update(Some(bad))).unwrap_err();
            assert_eq!(field_names(err), vec!["stream_url".to_string()]);
        }
    }

    #[test]
    fn update_accepts_network_or_blank_stream_url() {
        for ok in [None, Some(""), Some("rtsp://cam.local/live"), Some(" https://cam/x ")] {
            let changes = camera_changes(&update(ok)).unwrap();
            assert!(changes.encrypted_url == SecretChange::Keep);
        }
    }

    #[test]
    fn update_reports_every_invalid_field() {
        let req = UpdateCameraRequest {
            name: Some("  ".into()),
            brand: Some("acme".into()),
            stream_url: Some("file:///x".into()),
            ..UpdateCameraRequest::default()
        };
        let mut names = field_names(camera_changes(&req).unwrap_err());
        names.sort();
        assert_eq!(names, vec!["brand", "name", "stream_url"]);
    }
}
