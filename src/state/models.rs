// Data models for regional records and the user profile
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PROFILE_NAME: &str = "Mahasiswa JTK";
pub const DEFAULT_PROFILE_STUDENT_ID: &str = "22222";
pub const DEFAULT_PROFILE_EMAIL: &str = "mahasiswa@jtk.polban.ac.id";

/// A regional statistic entry (average length of schooling per regency).
///
/// `id == 0` means the record has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: i64,
    pub province_code: i64,
    pub province_name: String,
    pub regency_code: i64,
    pub regency_name: String,
    pub value: f64,
    pub unit: String,
    pub year: i32,
}

impl Record {
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} has an invalid value: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A record as entered by the user, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub province_code: i64,
    pub province_name: String,
    pub regency_code: i64,
    pub regency_name: String,
    pub value: f64,
    pub unit: String,
    pub year: i32,
}

impl RecordDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("province_name", &self.province_name)?;
        require_text("regency_name", &self.regency_name)?;
        require_text("unit", &self.unit)?;
        check_values(self.value, self.year)
    }

    pub fn into_record(self) -> Record {
        Record {
            id: 0,
            province_code: self.province_code,
            province_name: self.province_name,
            regency_code: self.regency_code,
            regency_name: self.regency_name,
            value: self.value,
            unit: self.unit,
            year: self.year,
        }
    }
}

/// The editable part of a stored record. Province fields are fixed once a
/// record exists, so they are not part of an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEdit {
    pub regency_code: i64,
    pub regency_name: String,
    pub value: f64,
    pub unit: String,
    pub year: i32,
}

impl RecordEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("regency_name", &self.regency_name)?;
        require_text("unit", &self.unit)?;
        check_values(self.value, self.year)
    }

    pub fn apply_to(self, record: &Record) -> Record {
        Record {
            id: record.id,
            province_code: record.province_code,
            province_name: record.province_name.clone(),
            regency_code: self.regency_code,
            regency_name: self.regency_name,
            value: self.value,
            unit: self.unit,
            year: self.year,
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    Ok(())
}

fn check_values(value: f64, year: i32) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Invalid {
            field: "value",
            reason: "must be a finite number".to_string(),
        });
    }
    if year <= 0 {
        return Err(ValidationError::Invalid {
            field: "year",
            reason: format!("{} is not a valid year", year),
        });
    }
    Ok(())
}

/// The app's single user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub student_id: String,
    pub email: String,
    pub age: i64,
    pub image: Option<Vec<u8>>,
    pub image_sha256: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            student_id: DEFAULT_PROFILE_STUDENT_ID.to_string(),
            email: DEFAULT_PROFILE_EMAIL.to_string(),
            age: 0,
            image: None,
            image_sha256: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RecordDraft {
        RecordDraft {
            province_code: 32,
            province_name: "JAWA BARAT".to_string(),
            regency_code: 3273,
            regency_name: "KOTA BANDUNG".to_string(),
            value: 11.0,
            unit: "TAHUN".to_string(),
            year: 2023,
        }
    }

    #[test]
    fn test_draft_validates() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_draft_rejects_blank_fields() {
        let mut d = draft();
        d.regency_name = "   ".to_string();
        assert_eq!(
            d.validate(),
            Err(ValidationError::Blank {
                field: "regency_name"
            })
        );

        let mut d = draft();
        d.unit = String::new();
        assert_eq!(d.validate(), Err(ValidationError::Blank { field: "unit" }));
    }

    #[test]
    fn test_draft_rejects_bad_numbers() {
        let mut d = draft();
        d.value = f64::NAN;
        assert!(matches!(
            d.validate(),
            Err(ValidationError::Invalid { field: "value", .. })
        ));

        let mut d = draft();
        d.year = 0;
        assert!(matches!(
            d.validate(),
            Err(ValidationError::Invalid { field: "year", .. })
        ));
    }

    #[test]
    fn test_draft_into_record_is_unpersisted() {
        let record = draft().into_record();
        assert_eq!(record.id, 0);
        assert!(!record.is_persisted());
        assert!(record.with_id(4).is_persisted());
    }

    #[test]
    fn test_edit_keeps_province() {
        let stored = draft().into_record().with_id(7);
        let edit = RecordEdit {
            regency_code: 3204,
            regency_name: "KABUPATEN BANDUNG".to_string(),
            value: 9.1,
            unit: "TAHUN".to_string(),
            year: 2024,
        };

        let updated = edit.apply_to(&stored);
        assert_eq!(updated.id, 7);
        assert_eq!(updated.province_code, 32);
        assert_eq!(updated.province_name, "JAWA BARAT");
        assert_eq!(updated.regency_code, 3204);
        assert_eq!(updated.year, 2024);
    }

    #[test]
    fn test_profile_defaults() {
        let profile = Profile::default();
        assert_eq!(profile.name, "Mahasiswa JTK");
        assert_eq!(profile.student_id, "22222");
        assert_eq!(profile.email, "mahasiswa@jtk.polban.ac.id");
        assert!(profile.image.is_none());
    }
}
