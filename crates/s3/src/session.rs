//! Session factory
//!
//! Builds an [`S3Session`] from a region and a profile name. Environment
//! session credentials win when the full triple is set; the profile store is
//! then never read. Otherwise the named profile supplies credentials and any
//! shared settings.

use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::profile::profile_file::ProfileFiles;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_smithy_types::error::display::DisplayErrorContext;
use s3utils_core::{
    CredentialResolver, CredentialSource, EnvironmentCredentials, Error, ObjectStore, Result,
    SessionFactory,
};
use tracing::debug;

use crate::client::S3Session;

/// Provider name attached to credentials taken from the environment
const ENVIRONMENT_PROVIDER_NAME: &str = "s3utils-environment";

/// Creates sessions against AWS S3 or an S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct AwsSessionFactory {
    resolver: CredentialResolver,
    profile_files: Option<ProfileFiles>,
    endpoint_url: Option<String>,
    force_path_style: bool,
}

impl AwsSessionFactory {
    /// Factory reading credentials from the process environment and the
    /// default profile files
    pub fn new() -> Self {
        Self {
            resolver: CredentialResolver::from_env(),
            profile_files: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }

    pub fn builder() -> AwsSessionFactoryBuilder {
        AwsSessionFactoryBuilder::default()
    }

    /// Establish a session for `region`, falling back to `profile`
    ///
    /// Credentials are resolved afresh on every call.
    pub async fn establish(&self, region: &str, profile: &str) -> Result<S3Session> {
        if region.trim().is_empty() {
            return Err(Error::SessionCreation("region must not be empty".to_string()));
        }

        let source = self.resolver.resolve(profile);
        let kind = source.kind();
        let config = match source {
            CredentialSource::Environment(creds) => self.environment_config(region, creds),
            CredentialSource::Profile(name) => self.profile_config(region, &name).await?,
        };
        debug!(region, credentials = %kind, "session established");

        Ok(S3Session::new(
            aws_sdk_s3::Client::from_conf(config),
            region,
            kind,
        ))
    }

    fn environment_config(
        &self,
        region: &str,
        creds: EnvironmentCredentials,
    ) -> aws_sdk_s3::Config {
        let credentials = Credentials::new(
            creds.access_key_id,
            creds.secret_access_key,
            Some(creds.session_token),
            None, // expiry
            ENVIRONMENT_PROVIDER_NAME,
        );

        // Built directly so no shared config or profile file is consulted
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .force_path_style(self.force_path_style);

        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        builder.build()
    }

    async fn profile_config(&self, region: &str, profile: &str) -> Result<aws_sdk_s3::Config> {
        if profile.trim().is_empty() {
            return Err(Error::SessionCreation(
                "profile must not be empty when environment credentials are not set".to_string(),
            ));
        }

        let mut provider = ProfileFileCredentialsProvider::builder().profile_name(profile);
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled());

        if let Some(files) = &self.profile_files {
            provider = provider.profile_files(files.clone());
            loader = loader.profile_files(files.clone());
        }
        let provider = provider.build();

        // Resolve once up front so an unknown or unreadable profile fails here
        // rather than on the first request
        provider.provide_credentials().await.map_err(|e| {
            Error::SessionCreation(format!(
                "failed to load credentials for profile '{profile}': {}",
                DisplayErrorContext(e)
            ))
        })?;

        let sdk_config = loader.credentials_provider(provider).load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(self.force_path_style);
        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(builder.build())
    }
}

impl Default for AwsSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for AwsSessionFactory {
    async fn create_session(&self, region: &str, profile: &str) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(self.establish(region, profile).await?))
    }
}

/// Builder for [`AwsSessionFactory`]
#[derive(Debug, Clone, Default)]
pub struct AwsSessionFactoryBuilder {
    resolver: Option<CredentialResolver>,
    profile_files: Option<ProfileFiles>,
    endpoint_url: Option<String>,
    force_path_style: bool,
}

impl AwsSessionFactoryBuilder {
    /// Replace the environment lookup used for credential precedence
    pub fn credential_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Read profiles from these files instead of `~/.aws/config` and
    /// `~/.aws/credentials`
    pub fn profile_files(mut self, files: ProfileFiles) -> Self {
        self.profile_files = Some(files);
        self
    }

    /// Send requests to an S3-compatible endpoint
    pub fn endpoint_url(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint.into());
        self
    }

    /// Use path-style addressing (`endpoint/bucket/key`)
    pub fn force_path_style(mut self, enabled: bool) -> Self {
        self.force_path_style = enabled;
        self
    }

    pub fn build(self) -> Result<AwsSessionFactory> {
        if let Some(endpoint) = &self.endpoint_url {
            url::Url::parse(endpoint).map_err(|e| {
                Error::SessionCreation(format!("invalid endpoint url '{endpoint}': {e}"))
            })?;
        }

        Ok(AwsSessionFactory {
            resolver: self.resolver.unwrap_or_default(),
            profile_files: self.profile_files,
            endpoint_url: self.endpoint_url,
            force_path_style: self.force_path_style,
        })
    }
}
