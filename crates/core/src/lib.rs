//! s3utils-core: SDK-independent logic for s3utils
//!
//! This crate provides:
//! - Credential precedence (environment session credentials, else a profile)
//! - Object key composition and file-name suffixing
//! - The `ObjectStore` and `SessionFactory` traits
//! - Unique-name search and upload orchestration on top of those traits
//!
//! Nothing here talks to the network directly; the `s3utils-s3` crate plugs
//! the AWS SDK in behind the traits.

pub mod credentials;
pub mod error;
pub mod key;
pub mod naming;
pub mod traits;
pub mod upload;

pub use credentials::{
    CredentialKind, CredentialResolver, CredentialSource, EnvironmentCredentials,
};
pub use error::{Error, Result};
pub use key::{ObjectKey, split_extension, suffixed_name};
pub use naming::{NamingBuilder, NamingConfig, candidate_names, generate_unique_name};
pub use traits::{ObjectBody, ObjectStore, PutOutcome, SessionFactory, WriteCondition};
pub use upload::{UploadReceipt, UploadRequest, open_body, upload_file, upload_file_unique};
