//! Collision-free object names
//!
//! Candidates are the base name itself, then `stem_1.ext`, `stem_2.ext`, and
//! so on, up to a configured bound. The search is not atomic: two writers
//! searching the same folder concurrently can settle on the same name. Use
//! [`crate::upload::upload_file_unique`] when the store honours conditional
//! writes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::key::{ObjectKey, suffixed_name};
use crate::traits::ObjectStore;

/// Default bound on suffixed candidates
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Limits for the unique-name search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Highest suffix tried; 0 means only the base name is considered
    pub max_attempts: u32,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Builder for [`NamingConfig`]
#[derive(Debug, Clone)]
pub struct NamingBuilder {
    max_attempts: u32,
}

impl NamingBuilder {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn build(self) -> NamingConfig {
        NamingConfig {
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for NamingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Every name the search will consider, in order
pub fn candidate_names(base: &str, max_attempts: u32) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain((1..=max_attempts).map(move |n| suffixed_name(base, n)))
}

/// Find a file name under `folder` that does not exist yet in `bucket`
///
/// Returns `base` unchanged when it is free. Lookup errors propagate as-is;
/// running out of candidates yields [`Error::NamesExhausted`].
pub async fn generate_unique_name<S>(
    store: &S,
    bucket: &str,
    folder: &str,
    base: &str,
    config: &NamingConfig,
) -> Result<String>
where
    S: ObjectStore + ?Sized,
{
    for candidate in candidate_names(base, config.max_attempts) {
        let key = ObjectKey::join(folder, &candidate);
        if !store.object_exists(bucket, &key).await? {
            debug!(bucket, %key, "found free object name");
            return Ok(candidate);
        }
        debug!(bucket, %key, "object name taken");
    }

    Err(Error::NamesExhausted {
        base: base.to_string(),
        attempts: config.max_attempts,
    })
}
