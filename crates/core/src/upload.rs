//! Upload orchestration
//!
//! The local file is always opened before a session exists, so an
//! unreadable path fails without touching the network. Each call creates its
//! own session.

use std::io;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::key::ObjectKey;
use crate::naming::{NamingConfig, candidate_names};
use crate::traits::{ObjectBody, PutOutcome, SessionFactory, WriteCondition};

/// Description of a single transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub region: String,
    pub profile: String,
    pub local_path: PathBuf,
    pub bucket: String,
    /// Destination folder inside the bucket, may be empty
    #[serde(default)]
    pub folder: String,
}

impl UploadRequest {
    pub fn new(
        region: impl Into<String>,
        profile: impl Into<String>,
        local_path: impl Into<PathBuf>,
        bucket: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            profile: profile.into(),
            local_path: local_path.into(),
            bucket: bucket.into(),
            folder: folder.into(),
        }
    }

    /// Base name of the local path, used as the object's file name
    pub fn file_name(&self) -> Result<&str> {
        self.local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::file_access(
                    &self.local_path,
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no UTF-8 file name"),
                )
            })
    }

    /// Key the file lands at when uploaded without renaming
    pub fn destination_key(&self) -> Result<ObjectKey> {
        Ok(ObjectKey::join(&self.folder, self.file_name()?))
    }
}

/// What a successful upload wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub bucket: String,
    pub key: ObjectKey,
    pub size_bytes: u64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub uploaded_at: Timestamp,
}

/// Open a local file for upload
///
/// Fails with [`Error::FileAccess`] if the path cannot be opened or is not a
/// regular file. The content type is guessed from the extension.
pub async fn open_body(path: &Path) -> Result<ObjectBody> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::file_access(path, e))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| Error::file_access(path, e))?;
    if !metadata.is_file() {
        return Err(Error::file_access(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());

    Ok(ObjectBody {
        file,
        path: path.to_path_buf(),
        size_bytes: metadata.len(),
        content_type,
    })
}

/// Upload a local file to `folder/<file name>` in the bucket
///
/// Existing objects at the key are replaced. No unique-name search happens
/// here; callers wanting one run [`crate::naming::generate_unique_name`]
/// first or use [`upload_file_unique`].
pub async fn upload_file<F>(factory: &F, request: &UploadRequest) -> Result<UploadReceipt>
where
    F: SessionFactory + ?Sized,
{
    let body = open_body(&request.local_path).await?;
    let key = request.destination_key()?;

    let session = factory
        .create_session(&request.region, &request.profile)
        .await?;

    let size_bytes = body.size_bytes;
    let content_type = body.content_type.clone();
    match session
        .put_object(&request.bucket, &key, body, WriteCondition::Overwrite)
        .await?
    {
        PutOutcome::Created { etag } => {
            info!(bucket = %request.bucket, %key, size_bytes, "upload complete");
            Ok(UploadReceipt {
                bucket: request.bucket.clone(),
                key,
                size_bytes,
                etag,
                content_type,
                uploaded_at: Timestamp::now(),
            })
        }
        PutOutcome::AlreadyExists => Err(Error::Upload(format!(
            "unconditional write to {key} reported an existing object"
        ))),
    }
}

/// Upload under the first free name, using conditional writes
///
/// Tries `name`, `name_1`, `name_2`, ... with `If-None-Match: *` so the
/// store itself arbitrates collisions. A conflict moves on to the next
/// candidate; any other failure aborts.
pub async fn upload_file_unique<F>(
    factory: &F,
    request: &UploadRequest,
    naming: &NamingConfig,
) -> Result<UploadReceipt>
where
    F: SessionFactory + ?Sized,
{
    let mut first_body = Some(open_body(&request.local_path).await?);
    let base = request.file_name()?;

    let session = factory
        .create_session(&request.region, &request.profile)
        .await?;

    for candidate in candidate_names(base, naming.max_attempts) {
        let key = ObjectKey::join(&request.folder, &candidate);
        let body = match first_body.take() {
            Some(body) => body,
            None => open_body(&request.local_path).await?,
        };
        let size_bytes = body.size_bytes;
        let content_type = body.content_type.clone();

        match session
            .put_object(&request.bucket, &key, body, WriteCondition::IfAbsent)
            .await?
        {
            PutOutcome::Created { etag } => {
                info!(bucket = %request.bucket, %key, size_bytes, "upload complete");
                return Ok(UploadReceipt {
                    bucket: request.bucket.clone(),
                    key,
                    size_bytes,
                    etag,
                    content_type,
                    uploaded_at: Timestamp::now(),
                });
            }
            PutOutcome::AlreadyExists => {
                debug!(bucket = %request.bucket, %key, "conditional write conflict");
            }
        }
    }

    Err(Error::NamesExhausted {
        base: base.to_string(),
        attempts: naming.max_attempts,
    })
}
