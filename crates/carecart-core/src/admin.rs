//! # Admin Entity Drafts
//!
//! Edit forms for the admin panel. One tagged variant per entity, so a
//! hospital form can never be submitted to the doctor endpoint.
//!
//! ```text
//! AdminEntityDraft
//! ├── Hospital(HospitalDraft)  → /api/hospitals
//! └── Doctor(DoctorDraft)      → /api/doctors
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Doctor, Hospital};
use crate::validation::{
    validate_name, validate_phone, validate_positive_amount, validate_text, ValidationResult,
};
use crate::error::ValidationError;

/// Upper bound on a doctor's years of practice.
const MAX_EXPERIENCE_YEARS: u32 = 70;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HospitalDraft {
    /// `None` when creating.
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub image_url: Option<String>,
}

impl HospitalDraft {
    pub fn validate(&self) -> ValidationResult<HospitalDraft> {
        Ok(HospitalDraft {
            id: self.id.clone(),
            name: validate_name("hospital name", &self.name)?,
            address: validate_text("address", &self.address, 300)?,
            city: validate_text("city", &self.city, 100)?,
            phone: validate_phone(&self.phone)?,
            image_url: trimmed(&self.image_url),
        })
    }
}

impl From<&Hospital> for HospitalDraft {
    fn from(h: &Hospital) -> Self {
        HospitalDraft {
            id: Some(h.id.clone()),
            name: h.name.clone(),
            address: h.address.clone(),
            city: h.city.clone(),
            phone: h.phone.clone(),
            image_url: h.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDraft {
    pub id: Option<String>,
    pub hospital_id: String,
    pub name: String,
    pub specialization: String,
    pub experience_years: u32,
    pub consultation_fee: Money,
    pub image_url: Option<String>,
}

impl DoctorDraft {
    pub fn validate(&self) -> ValidationResult<DoctorDraft> {
        let name = validate_name("doctor name", &self.name)?;
        let specialization = validate_text("specialization", &self.specialization, 100)?;
        let hospital_id = validate_text("hospital", &self.hospital_id, 64)?;

        if self.experience_years > MAX_EXPERIENCE_YEARS {
            return Err(ValidationError::OutOfRange {
                field: "experience".to_string(),
                min: 0,
                max: MAX_EXPERIENCE_YEARS as i64,
            });
        }
        validate_positive_amount("consultation fee", self.consultation_fee)?;

        Ok(DoctorDraft {
            id: self.id.clone(),
            hospital_id,
            name,
            specialization,
            experience_years: self.experience_years,
            consultation_fee: self.consultation_fee,
            image_url: trimmed(&self.image_url),
        })
    }
}

impl From<&Doctor> for DoctorDraft {
    fn from(d: &Doctor) -> Self {
        DoctorDraft {
            id: Some(d.id.clone()),
            hospital_id: d.hospital_id.clone(),
            name: d.name.clone(),
            specialization: d.specialization.clone(),
            experience_years: d.experience_years,
            consultation_fee: d.consultation_fee,
            image_url: d.image_url.clone(),
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The entity being edited in the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "entity", content = "draft", rename_all = "camelCase")]
pub enum AdminEntityDraft {
    Hospital(HospitalDraft),
    Doctor(DoctorDraft),
}

impl AdminEntityDraft {
    /// Validated copy of the draft, same variant.
    pub fn validate(&self) -> ValidationResult<AdminEntityDraft> {
        match self {
            AdminEntityDraft::Hospital(h) => h.validate().map(AdminEntityDraft::Hospital),
            AdminEntityDraft::Doctor(d) => d.validate().map(AdminEntityDraft::Doctor),
        }
    }

    /// Backend id, `None` for a new entity.
    pub fn id(&self) -> Option<&str> {
        match self {
            AdminEntityDraft::Hospital(h) => h.id.as_deref(),
            AdminEntityDraft::Doctor(d) => d.id.as_deref(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// "hospital" or "doctor", for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AdminEntityDraft::Hospital(_) => "hospital",
            AdminEntityDraft::Doctor(_) => "doctor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hospital() -> HospitalDraft {
        HospitalDraft {
            id: None,
            name: "City Care".to_string(),
            address: "4 Park Street".to_string(),
            city: "Kolkata".to_string(),
            phone: "0331234567".to_string(),
            image_url: Some(" ".to_string()),
        }
    }

    fn doctor() -> DoctorDraft {
        DoctorDraft {
            id: Some("d1".to_string()),
            hospital_id: "h1".to_string(),
            name: "Dr. Iyer".to_string(),
            specialization: "Cardiology".to_string(),
            experience_years: 12,
            consultation_fee: Money::from_rupees(800),
            image_url: None,
        }
    }

    #[test]
    fn test_hospital_draft() {
        let draft = AdminEntityDraft::Hospital(hospital());
        assert!(draft.is_new());
        assert_eq!(draft.kind(), "hospital");
        match draft.validate().unwrap() {
            AdminEntityDraft::Hospital(h) => assert_eq!(h.image_url, None),
            other => panic!("variant changed: {other:?}"),
        }

        let mut bad = hospital();
        bad.phone = "033".to_string();
        assert_eq!(
            AdminEntityDraft::Hospital(bad).validate().unwrap_err().field(),
            "phone"
        );
    }

    #[test]
    fn test_doctor_draft() {
        let draft = AdminEntityDraft::Doctor(doctor());
        assert_eq!(draft.id(), Some("d1"));
        assert!(draft.validate().is_ok());

        let mut free = doctor();
        free.consultation_fee = Money::zero();
        assert!(matches!(
            free.validate(),
            Err(ValidationError::MustBePositive { .. })
        ));

        let mut veteran = doctor();
        veteran.experience_years = 90;
        assert!(veteran.validate().is_err());

        let mut orphan = doctor();
        orphan.hospital_id = String::new();
        assert_eq!(orphan.validate().unwrap_err().field(), "hospital");
    }

    #[test]
    fn test_tagged_wire_shape() {
        let json = serde_json::to_value(AdminEntityDraft::Doctor(doctor())).unwrap();
        assert_eq!(json["entity"], "doctor");
        assert_eq!(json["draft"]["hospitalId"], "h1");
    }
}
