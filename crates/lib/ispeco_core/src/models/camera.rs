//! Camera domain models.

use std::fmt;

use uuid::Uuid;

use super::choice_enum;

choice_enum! {
    /// Where a camera is installed. Also used as the camera scope of a
    /// delegated access grant, where `both` covers every environment.
    pub enum Environment in "camera_environment" {
        Indoor => "indoor",
        Outdoor => "outdoor",
        Both => "both",
    }
}

choice_enum! {
    /// Physical camera type.
    pub enum CameraType in "camera_type" {
        Dome => "dome",
        Bullet => "bullet",
        Ptz => "ptz",
        CMount => "c_mount",
        DayNight => "day_night",
        Thermal => "thermal",
        Wireless => "wireless",
        Hd => "hd",
        Degree360 => "360",
        NetworkIp => "network_ip",
    }
}

choice_enum! {
    pub enum Resolution in "camera_resolution" {
        Mp1 => "1mp",
        Mp2 => "2mp",
        Mp3 => "3mp",
        Mp4 => "4mp",
        Mp5 => "5mp",
        Mp6 => "6mp",
        Mp7 => "7mp",
        Mp8 => "8mp",
    }
}

choice_enum! {
    pub enum Brand in "camera_brand" {
        Samsung => "samsung",
        Avigilon => "avigilon",
        Honeywell => "honeywell",
        AxisCommunication => "axiscommunication",
        Panasonic => "panasonic",
        Vivotek => "vivotek",
        AlhuaTechnology => "alhuatechnology",
        HikVision => "hikvision",
        Bosch => "bosch",
        CpPlus => "cp_plus",
        Others => "others",
    }
}

choice_enum! {
    pub enum IndustryType in "industry_type" {
        Retail => "retail",
        Restaurant => "restaurant",
        Club => "club",
        Others => "others",
    }
}

impl Environment {
    /// Whether a grant scoped to `self` covers a camera installed in `camera`.
    pub fn covers(self, camera: Environment) -> bool {
        self == Environment::Both || self == camera
    }
}

/// Database row for `cameras`.
///
/// Only ever holds ciphertext for the connection secrets. Plaintext is
/// produced by [`crate::secrets::SecretCodec`] at the request or session
/// boundary and never stored on this type.
#[derive(Clone, sqlx::FromRow)]
pub struct Camera {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub camera_type: CameraType,
    pub industry_type: IndustryType,
    pub environment: Environment,
    pub resolution: Resolution,
    pub brand: Brand,
    pub encrypted_url: Option<Vec<u8>>,
    pub encrypted_password: Option<Vec<u8>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Camera {
    pub fn has_url(&self) -> bool {
        self.encrypted_url.is_some()
    }

    pub fn has_password(&self) -> bool {
        self.encrypted_password.is_some()
    }
}

// Ciphertext stays out of logs.
impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("name", &self.name)
            .field("camera_type", &self.camera_type)
            .field("environment", &self.environment)
            .field("has_url", &self.has_url())
            .field("has_password", &self.has_password())
            .finish_non_exhaustive()
    }
}

/// Default display name when a camera is registered without one.
pub fn default_camera_name(brand: Brand, camera_type: CameraType) -> String {
    format!("{brand} {camera_type}")
}

/// Values for a new camera row. Secrets are already encrypted.
#[derive(Clone)]
pub struct NewCamera {
    pub owner_id: Uuid,
    pub name: String,
    pub camera_type: CameraType,
    pub industry_type: IndustryType,
    pub environment: Environment,
    pub resolution: Resolution,
    pub brand: Brand,
    pub encrypted_url: Option<Vec<u8>>,
    pub encrypted_password: Option<Vec<u8>>,
}

/// Update of one encrypted camera secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum SecretChange {
    /// Leave the stored value as it is.
    #[default]
    Keep,
    /// Remove the stored value.
    Clear,
    /// Replace the stored value with this ciphertext.
    Set(Vec<u8>),
}

impl SecretChange {
    /// Whether the column is written at all.
    pub fn writes(&self) -> bool {
        !matches!(self, SecretChange::Keep)
    }

    /// The value written when [`writes`](Self::writes) is true.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            SecretChange::Set(ciphertext) => Some(ciphertext),
            SecretChange::Keep | SecretChange::Clear => None,
        }
    }
}

/// Partial update of a camera row. `None` leaves a column untouched.
#[derive(Clone, Default)]
pub struct CameraChanges {
    pub name: Option<String>,
    pub camera_type: Option<CameraType>,
    pub industry_type: Option<IndustryType>,
    pub environment: Option<Environment>,
    pub resolution: Option<Resolution>,
    pub brand: Option<Brand>,
    pub encrypted_url: SecretChange,
    pub encrypted_password: SecretChange,
}

// Ciphertext stays out of logs.
impl fmt::Debug for CameraChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraChanges")
            .field("name", &self.name)
            .field("camera_type", &self.camera_type)
            .field("industry_type", &self.industry_type)
            .field("environment", &self.environment)
            .field("resolution", &self.resolution)
            .field("brand", &self.brand)
            .field("writes_url", &self.encrypted_url.writes())
            .field("writes_password", &self.encrypted_password.writes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_scope_covers_everything() {
        for env in [Environment::Indoor, Environment::Outdoor, Environment::Both] {
            assert!(Environment::Both.covers(env));
        }
    }

    #[test]
    fn secret_change_distinguishes_clear_from_keep() {
        assert!(!SecretChange::Keep.writes());
        assert_eq!(SecretChange::Keep.value(), None);
        assert!(SecretChange::Clear.writes());
        assert_eq!(SecretChange::Clear.value(), None);
        let set = SecretChange::Set(vec![1, 2, 3]);
        assert!(set.writes());
        assert_eq!(set.value(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn narrow_scope_covers_only_itself() {
        assert!(Environment::Indoor.covers(Environment::Indoor));
        assert!(!Environment::Indoor.covers(Environment::Outdoor));
        assert!(!Environment::Outdoor.covers(Environment::Both));
    }

    #[test]
    fn choices_parse_from_wire_values() {
        assert_eq!("360".parse::<CameraType>(), Ok(CameraType::Degree360));
        assert_eq!(" cp_plus ".parse::<Brand>(), Ok(Brand::CpPlus));
        assert_eq!(Resolution::Mp4.to_string(), "4mp");
    }

    #[test]
    fn invalid_choice_lists_allowed_values() {
        let err = "garage".parse::<Environment>().unwrap_err();
        assert_eq!(err.value, "garage");
        assert_eq!(err.allowed, &["indoor", "outdoor", "both"]);
        assert!(err.to_string().contains("indoor, outdoor, both"));
    }

    #[test]
    fn serde_uses_wire_values() {
        let json = serde_json::to_string(&CameraType::DayNight).unwrap();
        assert_eq!(json, "\"day_night\"");
    }

    #[test]
    fn debug_output_hides_ciphertext() {
        let camera = Camera {
            id: Uuid::nil(),
            owner_id: Uuid::nil(),
            name: "front door".into(),
            camera_type: CameraType::Dome,
            industry_type: IndustryType::Retail,
            environment: Environment::Outdoor,
            resolution: Resolution::Mp2,
            brand: Brand::Bosch,
            encrypted_url: Some(vec![0xde, 0xad, 0xbe, 0xef]),
            encrypted_password: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let rendered = format!("{camera:?}");
        assert!(rendered.contains("has_url: true"));
        assert!(!rendered.contains("222"));
        assert!(!rendered.contains("encrypted_url"));
    }

    #[test]
    fn default_name_uses_brand_and_type() {
        assert_eq!(
            default_camera_name(Brand::HikVision, CameraType::Bullet),
            "hikvision bullet"
        );
    }
}
