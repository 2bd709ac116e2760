//! S3 session implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3utils-core.

use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::byte_stream::{ByteStream, Length};
use s3utils_core::{
    CredentialKind, Error, ObjectBody, ObjectKey, ObjectStore, PutOutcome, Result, WriteCondition,
};
use tracing::debug;

/// Error codes S3-compatible stores return when a conditional write loses
const CONDITIONAL_CONFLICT_CODES: [&str; 2] = ["PreconditionFailed", "ConditionalRequestConflict"];

/// An established S3 session
///
/// Immutable once built. Clones share the underlying SDK client.
#[derive(Debug, Clone)]
pub struct S3Session {
    inner: aws_sdk_s3::Client,
    region: String,
    credential_kind: CredentialKind,
}

impl S3Session {
    pub(crate) fn new(
        inner: aws_sdk_s3::Client,
        region: impl Into<String>,
        credential_kind: CredentialKind,
    ) -> Self {
        Self {
            inner,
            region: region.into(),
            credential_kind,
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Which credential path this session was built from
    pub fn credential_kind(&self) -> CredentialKind {
        self.credential_kind
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E>(error: &SdkError<E, HttpResponse>) -> String
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        match error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let status = service_err.raw().status().as_u16();
                let mut msg = format!("Service error: {err}");
                if let Some(code) = err.code() {
                    msg.push_str(&format!(" (code: {code}, status: {status})"));
                } else {
                    msg.push_str(&format!(" (status: {status})"));
                }
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {err:?}")
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {err:?}")
            }
            SdkError::ResponseError(err) => {
                format!("Response error: {err:?}")
            }
            _ => error.to_string(),
        }
    }
}

/// Map a HeadObject failure: not-found means absent, anything else is an error
fn classify_head_error(error: SdkError<HeadObjectError, HttpResponse>) -> Result<bool> {
    let service_err = error.as_service_error();
    let not_found = service_err
        .is_some_and(|e| e.is_not_found() || matches!(e.code(), Some("NotFound" | "NoSuchKey")));
    if not_found {
        return Ok(false);
    }

    Err(Error::Provider {
        code: service_err.and_then(|e| e.code()).map(str::to_string),
        message: S3Session::format_sdk_error(&error),
    })
}

/// Whether a PutObject failure is a lost `If-None-Match` race
fn is_conditional_conflict(error: &SdkError<PutObjectError, HttpResponse>) -> bool {
    match error {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            service_err
                .err()
                .code()
                .is_some_and(|code| CONDITIONAL_CONFLICT_CODES.contains(&code))
                || status == 412
        }
        _ => false,
    }
}

#[async_trait]
impl ObjectStore for S3Session {
    async fn object_exists(&self, bucket: &str, key: &ObjectKey) -> Result<bool> {
        debug!(bucket, %key, "checking object");
        match self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => classify_head_error(e),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        body: ObjectBody,
        condition: WriteCondition,
    ) -> Result<PutOutcome> {
        let ObjectBody {
            file,
            path,
            size_bytes,
            content_type,
        } = body;

        let stream = ByteStream::read_from()
            .file(file)
            .length(Length::Exact(size_bytes))
            .build()
            .await
            .map_err(|e| Error::Upload(format!("failed to read {}: {e}", path.display())))?;

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key.as_str())
            .body(stream);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        if condition == WriteCondition::IfAbsent {
            request = request.if_none_match("*");
        }

        match request.send().await {
            Ok(response) => Ok(PutOutcome::Created {
                etag: response.e_tag().map(|etag| etag.trim_matches('"').to_string()),
            }),
            Err(e) if condition == WriteCondition::IfAbsent && is_conditional_conflict(&e) => {
                Ok(PutOutcome::AlreadyExists)
            }
            Err(e) => Err(Error::Upload(Self::format_sdk_error(&e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::NotFound;
    use aws_smithy_http_client::test_util::{CaptureRequestReceiver, capture_request};
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn response(status: u16) -> HttpResponse {
        HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    fn head_error(code: &str, status: u16) -> SdkError<HeadObjectError, HttpResponse> {
        let meta = ErrorMetadata::builder()
            .code(code)
            .message("request failed")
            .build();
        SdkError::service_error(HeadObjectError::generic(meta), response(status))
    }

    #[test]
    fn test_modeled_not_found_is_absent() {
        let err = SdkError::service_error(
            HeadObjectError::NotFound(NotFound::builder().build()),
            response(404),
        );
        assert!(!classify_head_error(err).unwrap());
    }

    #[test]
    fn test_not_found_codes_are_absent() {
        assert!(!classify_head_error(head_error("NotFound", 404)).unwrap());
        assert!(!classify_head_error(head_error("NoSuchKey", 404)).unwrap());
    }

    #[test]
    fn test_other_codes_are_errors() {
        let err = classify_head_error(head_error("AccessDenied", 403)).unwrap_err();
        assert_eq!(err.code(), Some("AccessDenied"));
        assert!(err.to_string().contains("status: 403"));

        let err = classify_head_error(head_error("NoSuchBucket", 404)).unwrap_err();
        assert_eq!(err.code(), Some("NoSuchBucket"));
    }

    #[test]
    fn test_message_text_is_not_inspected() {
        // A message mentioning NotFound under a different code stays an error
        let meta = ErrorMetadata::builder()
            .code("InternalError")
            .message("NotFound")
            .build();
        let err = SdkError::service_error(HeadObjectError::generic(meta), response(500));
        assert!(classify_head_error(err).is_err());
    }

    #[test]
    fn test_non_service_errors_are_errors() {
        let err: SdkError<HeadObjectError, HttpResponse> =
            SdkError::timeout_error("deadline elapsed");
        let err = classify_head_error(err).unwrap_err();
        assert_eq!(err.code(), None);
        assert!(err.to_string().contains("Request timeout"));
    }

    #[test]
    fn test_conditional_conflict_detection() {
        let conflict = |code: &str, status: u16| {
            let meta = ErrorMetadata::builder().code(code).build();
            SdkError::service_error(PutObjectError::generic(meta), response(status))
        };

        assert!(is_conditional_conflict(&conflict("PreconditionFailed", 412)));
        assert!(is_conditional_conflict(&conflict(
            "ConditionalRequestConflict",
            409
        )));
        assert!(!is_conditional_conflict(&conflict("AccessDenied", 403)));
        assert!(!is_conditional_conflict(&SdkError::timeout_error("slow")));
    }

    const PRECONDITION_FAILED: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Error><Code>PreconditionFailed</Code>\
        <Message>At least one of the pre-conditions you specified did not hold</Message>\
        <Condition>If-None-Match</Condition></Error>";

    /// A session whose requests are captured instead of sent, answered with
    /// `status` and `body`
    fn capturing_session(
        status: u16,
        etag: Option<&str>,
        body: &'static str,
    ) -> (S3Session, CaptureRequestReceiver) {
        let mut response = http::Response::builder().status(status);
        if let Some(etag) = etag {
            response = response.header("ETag", etag);
        }
        let response = response.body(SdkBody::from(body)).unwrap();
        let (http_client, captured) = capture_request(Some(response));

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-west-2"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .http_client(http_client)
            .build();
        let session = S3Session::new(
            aws_sdk_s3::Client::from_conf(config),
            "us-west-2",
            CredentialKind::Environment,
        );
        (session, captured)
    }

    async fn png_body() -> (NamedTempFile, ObjectBody) {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG\r\n\x1a\n00000000").unwrap();
        let body = s3utils_core::open_body(file.path()).await.unwrap();
        (file, body)
    }

    #[tokio::test]
    async fn test_put_overwrite_sends_no_condition() {
        let (session, captured) = capturing_session(200, Some("\"abc123\""), "");
        let (_file, body) = png_body().await;
        let key = ObjectKey::join("images", "logo.png");

        let outcome = session
            .put_object("bucket", &key, body, WriteCondition::Overwrite)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PutOutcome::Created {
                etag: Some("abc123".to_string())
            }
        );
        let request = captured.expect_request();
        assert!(request.uri().contains("images/logo.png"), "{}", request.uri());
        assert_eq!(request.headers().get("content-type"), Some("image/png"));
        assert_eq!(request.headers().get("if-none-match"), None);
    }

    #[tokio::test]
    async fn test_put_if_absent_sends_if_none_match() {
        let (session, captured) = capturing_session(200, None, "");
        let (_file, body) = png_body().await;
        let key = ObjectKey::from("logo.png");

        let outcome = session
            .put_object("bucket", &key, body, WriteCondition::IfAbsent)
            .await
            .unwrap();

        assert_eq!(outcome, PutOutcome::Created { etag: None });
        let request = captured.expect_request();
        assert_eq!(request.headers().get("if-none-match"), Some("*"));
    }

    #[tokio::test]
    async fn test_put_if_absent_conflict_is_already_exists() {
        let (session, _captured) = capturing_session(412, None, PRECONDITION_FAILED);
        let (_file, body) = png_body().await;

        let outcome = session
            .put_object(
                "bucket",
                &ObjectKey::from("logo.png"),
                body,
                WriteCondition::IfAbsent,
            )
            .await
            .unwrap();

        assert_eq!(outcome, PutOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_put_overwrite_precondition_failure_is_upload_error() {
        let (session, _captured) = capturing_session(412, None, PRECONDITION_FAILED);
        let (_file, body) = png_body().await;

        let err = session
            .put_object(
                "bucket",
                &ObjectKey::from("logo.png"),
                body,
                WriteCondition::Overwrite,
            )
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, Error::Upload(_)), "got {msg}");
        assert!(msg.contains("PreconditionFailed"), "got {msg}");
        assert!(msg.contains("status: 412"), "got {msg}");
    }
}
