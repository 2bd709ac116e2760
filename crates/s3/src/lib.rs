//! s3utils-s3: aws-sdk-s3 adapter for s3utils
//!
//! Provides [`S3Session`], an `ObjectStore` backed by `aws_sdk_s3::Client`,
//! and [`AwsSessionFactory`], which applies the environment-then-profile
//! credential policy. The `helpers` functions wrap both for one-call use.

mod client;
mod helpers;
mod session;

pub use client::S3Session;
pub use helpers::{
    check_object_exists, generate_unique_file_name, has_env_credentials, new_session, upload_to_s3,
};
pub use session::{AwsSessionFactory, AwsSessionFactoryBuilder};

pub use s3utils_core::{
    CredentialKind, Error, NamingBuilder, NamingConfig, ObjectKey, Result, UploadReceipt,
    UploadRequest,
};
