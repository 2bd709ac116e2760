//! One-call helpers over the default session factory
//!
//! These take plain strings and use [`AwsSessionFactory::new`], which reads
//! the process environment and the default profile files.

use std::path::Path;

use s3utils_core::{
    CredentialResolver, NamingConfig, ObjectKey, ObjectStore as _, Result, UploadReceipt,
    UploadRequest,
};

use crate::client::S3Session;
use crate::session::AwsSessionFactory;

/// Whether complete session credentials are set in the environment
pub fn has_env_credentials() -> bool {
    CredentialResolver::from_env().has_env_credentials()
}

/// Create a session for `region`, using environment credentials or `profile`
pub async fn new_session(region: &str, profile: &str) -> Result<S3Session> {
    AwsSessionFactory::new().establish(region, profile).await
}

/// Check whether `key` exists in `bucket`
pub async fn check_object_exists(session: &S3Session, bucket: &str, key: &str) -> Result<bool> {
    session.object_exists(bucket, &ObjectKey::from(key)).await
}

/// Find a name for `base_name` that is free under `folder` in `bucket`
///
/// Uses the default [`NamingConfig`] bound.
pub async fn generate_unique_file_name(
    session: &S3Session,
    bucket: &str,
    folder: &str,
    base_name: &str,
) -> Result<String> {
    s3utils_core::generate_unique_name(session, bucket, folder, base_name, &NamingConfig::default())
        .await
}

/// Upload `file_name` to `folder/<base name>` in `bucket` with a fresh session
pub async fn upload_to_s3(
    region: &str,
    profile: &str,
    file_name: impl AsRef<Path>,
    bucket: &str,
    folder: &str,
) -> Result<UploadReceipt> {
    let request = UploadRequest::new(region, profile, file_name.as_ref(), bucket, folder);
    s3utils_core::upload_file(&AwsSessionFactory::new(), &request).await
}
