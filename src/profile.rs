// User profile: singleton row in the app database plus a single-writer editor
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tokio::sync::watch;

use crate::state::storage::calculate_sha256;
use crate::state::{queries, DbConnection, DbError, Profile, ValidationError};

lazy_static! {
    /// Letters and spaces only
    /// - Valid: "Mahasiswa JTK", "Siti"
    /// - Invalid: "Budi2", "O'Neil"
    pub static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-z ]+$").unwrap();

    /// Digits only
    pub static ref STUDENT_ID_REGEX: Regex = Regex::new(r"^\d+$").unwrap();

    /// Loose address check: something@something
    pub static ref EMAIL_REGEX: Regex = Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").unwrap();
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Invalid profile: {0}")]
    Validation(#[from] ValidationError),
    #[error("Profile image is empty")]
    EmptyImage,
}

pub type ProfileResult<T> = Result<T, ProfileError>;

fn check(field: &'static str, value: &str, pattern: &Regex, reason: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if !pattern.is_match(value) {
        return Err(ValidationError::Invalid {
            field,
            reason: reason.to_string(),
        });
    }
    Ok(())
}

pub fn validate_details(name: &str, student_id: &str, email: &str) -> Result<(), ValidationError> {
    check("name", name, &NAME_REGEX, "only letters and spaces are allowed")?;
    check("student_id", student_id, &STUDENT_ID_REGEX, "only digits are allowed")?;
    check("email", email, &EMAIL_REGEX, "not a valid email address")?;
    Ok(())
}

/// Persistence for the single profile row
#[derive(Clone)]
pub struct ProfileStore {
    db: DbConnection,
}

impl ProfileStore {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub fn load(&self) -> ProfileResult<Option<Profile>> {
        Ok(queries::get_profile(&self.db)?)
    }

    pub fn save(&self, profile: &Profile) -> ProfileResult<()> {
        queries::save_profile(&self.db, profile)?;
        Ok(())
    }

    /// Replace (or remove) the image, creating the row if needed
    pub fn set_image(&self, image: Option<Vec<u8>>) -> ProfileResult<Profile> {
        let mut profile = self.load()?.unwrap_or_default();
        profile.image_sha256 = image.as_deref().map(calculate_sha256);
        profile.image = image;
        profile.updated_at = Some(Utc::now());
        self.save(&profile)?;
        Ok(profile)
    }
}

/// The only writer of the profile row. Every successful write is published
/// on the `profile` slot.
pub struct ProfileEditor {
    store: ProfileStore,
    slot: watch::Sender<Profile>,
}

impl ProfileEditor {
    pub fn new(store: ProfileStore) -> ProfileResult<Self> {
        let current = store.load()?.unwrap_or_default();
        let (slot, _) = watch::channel(current);
        Ok(Self { store, slot })
    }

    /// The stored profile, or the defaults when none was saved yet
    pub fn current(&self) -> Profile {
        self.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Profile> {
        self.slot.subscribe()
    }

    fn publish(&self, profile: Profile) -> Profile {
        self.slot.send_replace(profile.clone());
        profile
    }

    pub fn update_details(&self, name: &str, student_id: &str, email: &str) -> ProfileResult<Profile> {
        validate_details(name, student_id, email)?;

        let mut profile = self.store.load()?.unwrap_or_default();
        profile.name = name.to_string();
        profile.student_id = student_id.to_string();
        profile.email = email.to_string();
        profile.updated_at = Some(Utc::now());
        self.store.save(&profile)?;

        log::info!("Profile details updated");
        Ok(self.publish(profile))
    }

    pub fn update_image(&self, image: Vec<u8>) -> ProfileResult<Profile> {
        if image.is_empty() {
            return Err(ProfileError::EmptyImage);
        }

        let current = self.current();
        if current.image_sha256.as_deref() == Some(calculate_sha256(&image).as_str()) {
            log::debug!("Profile image unchanged, skipping write");
            return Ok(current);
        }

        let profile = self.store.set_image(Some(image))?;
        log::info!("Profile image replaced ({:?})", profile.image_sha256);
        Ok(self.publish(profile))
    }

    pub fn clear_image(&self) -> ProfileResult<Profile> {
        let current = self.current();
        if current.image.is_none() {
            return Ok(current);
        }

        let profile = self.store.set_image(None)?;
        log::info!("Profile image removed");
        Ok(self.publish(profile))
    }
}
