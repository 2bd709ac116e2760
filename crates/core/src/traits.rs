//! Storage seams
//!
//! `ObjectStore` is what a session can do against the provider and
//! `SessionFactory` is how sessions come to exist. Both are implemented by
//! the SDK adapter crate and mocked in tests here.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::key::ObjectKey;

/// An opened local file ready to be transferred
///
/// Owns the file handle; dropping the body closes the file.
#[derive(Debug)]
pub struct ObjectBody {
    pub file: tokio::fs::File,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Whether a write may replace an existing object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Always write, replacing any existing object
    Overwrite,
    /// Write only if no object exists at the key (`If-None-Match: *`)
    IfAbsent,
}

/// Result of a put that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The object was written
    Created { etag: Option<String> },
    /// A conditional write found the key taken
    AlreadyExists,
}

/// Operations a session performs against the object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only check; `Ok(false)` only for a not-found response
    async fn object_exists(&self, bucket: &str, key: &ObjectKey) -> Result<bool>;

    /// Transfer the whole body to `bucket/key` in a single request
    async fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        body: ObjectBody,
        condition: WriteCondition,
    ) -> Result<PutOutcome>;
}

/// Builds sessions from a region and a profile name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(&self, region: &str, profile: &str) -> Result<Box<dyn ObjectStore>>;
}
