use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConnectionStatus, Role};

/// A registered portal user. Registration itself happens outside this
/// crate; rows arrive through the seed file or the registration service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub aarogya_id: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub blood_group: Option<String>,
    pub specialization: Option<String>,
    pub is_public: bool,
    pub is_authorized: bool,
    pub registration_date: DateTime<Utc>,
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: String,
    pub aarogya_id: String,
    pub role: Role,
    pub is_authorized: bool,
}

impl Caller {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }
}

impl From<&UserProfile> for Caller {
    fn from(user: &UserProfile) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            aarogya_id: user.aarogya_id.clone(),
            role: user.role,
            is_authorized: user.is_authorized,
        }
    }
}

/// Patient profile as returned to a doctor's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub aarogya_id: String,
    pub email: String,
    pub display_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub blood_group: Option<String>,
    /// Status of the open request between the searching doctor and this
    /// patient, if any. Lets the UI disable "send request" up front.
    pub connection_status: Option<ConnectionStatus>,
}

impl PatientProfile {
    pub fn from_user(user: &UserProfile, connection_status: Option<ConnectionStatus>) -> Self {
        Self {
            id: user.id,
            aarogya_id: user.aarogya_id.clone(),
            email: user.email.clone(),
            display_name: user
                .display_name
                .clone()
                .unwrap_or_else(|| fallback_name(&user.email)),
            age: user.age,
            gender: user.gender.clone(),
            phone_number: user.phone_number.clone(),
            blood_group: user.blood_group.clone(),
            connection_status,
        }
    }
}

/// Public directory entry for a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub email: String,
    pub aarogya_id: String,
    pub display_name: String,
    pub specialization: Option<String>,
    pub is_public: bool,
    pub is_authorized: bool,
}

impl From<&UserProfile> for DoctorInfo {
    fn from(user: &UserProfile) -> Self {
        Self {
            email: user.email.clone(),
            aarogya_id: user.aarogya_id.clone(),
            display_name: user
                .display_name
                .clone()
                .unwrap_or_else(|| fallback_name(&user.email)),
            specialization: user.specialization.clone(),
            is_public: user.is_public,
            is_authorized: user.is_authorized,
        }
    }
}

/// Body of the directory-listing toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PublicStatusBody {
    pub is_public: bool,
}

static AAROGYA_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^R[PD][0-9]{10}$").expect("valid regex")
});

/// `RP` (patient) or `RD` (doctor) followed by four date digits and six
/// random digits.
pub fn is_valid_aarogya_id(id: &str) -> bool {
    AAROGYA_ID.is_match(id)
}

/// Local part of the email, used when a profile has no name yet.
fn fallback_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
