use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::models::Profile;

/// Immutable snapshot of the profile records served at `/users`
///
/// Loaded once at startup; cloning shares the same records.
#[derive(Debug, Clone)]
pub struct ProfileDirectory {
    profiles: Arc<[Profile]>,
}

impl ProfileDirectory {
    /// Read the dataset file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a JSON array of profiles.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile dataset {}", path.display()))?;
        let profiles: Vec<Profile> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid profile dataset {}", path.display()))?;

        info!("Loaded {} profiles from {}", profiles.len(), path.display());
        Ok(Self::from_profiles(profiles))
    }

    #[must_use]
    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: profiles.into(),
        }
    }

    /// All records in file order
    #[must_use]
    pub fn all(&self) -> &[Profile] {
        &self.profiles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
