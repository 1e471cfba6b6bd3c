use std::collections::HashMap;
use std::time::Duration;

use smbfs_proto::SmbError;

use crate::authority::Credentials;

/// Keys with this prefix are forwarded verbatim to the collaborator (§4.4,
/// §6) instead of being interpreted by the registry.
pub const PASSTHROUGH_PREFIX: &str = "smb.lib.";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Validated construction options for a `FileSystem` (§4.4, §6). Built via
/// `FileSystemOptionsBuilder`, mirroring the teacher's `Config`/
/// `ConfigBuilder` split.
#[derive(Debug, Clone, Default)]
pub struct FileSystemOptions {
    domain: Option<String>,
    username: Option<String>,
    password: Option<String>,
    watchservice_enabled: bool,
    poll_interval: Option<Duration>,
    passthrough: HashMap<String, String>,
}

impl FileSystemOptions {
    pub fn credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|user| Credentials {
            domain: self.domain.clone(),
            user: user.clone(),
            password: self.password.clone(),
        })
    }

    pub fn watchservice_enabled(&self) -> bool {
        self.watchservice_enabled
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn passthrough(&self) -> &HashMap<String, String> {
        &self.passthrough
    }

    /// Parse the §6 options map: `domain`, `username`, `password`,
    /// `smb.watchservice.enabled`, `smb.watchservice.pollInterval`
    /// (milliseconds), plus any `smb.lib.`-prefixed passthrough key.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, SmbError> {
        let mut builder = FileSystemOptionsBuilder::new();
        for (key, value) in map {
            match key.as_str() {
                "domain" => builder = builder.domain(value.clone()),
                "username" => builder = builder.username(value.clone()),
                "password" => builder = builder.password(value.clone()),
                "smb.watchservice.enabled" => {
                    let enabled = value.parse::<bool>().map_err(|_| {
                        SmbError::InvalidArgument(format!("smb.watchservice.enabled must be a bool, got {value:?}"))
                    })?;
                    builder = builder.watchservice_enabled(enabled);
                }
                "smb.watchservice.pollInterval" => {
                    let millis = value.parse::<u64>().map_err(|_| {
                        SmbError::InvalidArgument(format!(
                            "smb.watchservice.pollInterval must be an integer, got {value:?}"
                        ))
                    })?;
                    builder = builder.poll_interval(Duration::from_millis(millis));
                }
                other if other.starts_with(PASSTHROUGH_PREFIX) => {
                    builder = builder.option(other.to_string(), value.clone());
                }
                other => {
                    return Err(SmbError::InvalidArgument(format!("unrecognized option {other:?}")));
                }
            }
        }
        builder.build_validated()
    }
}

/// Builder for `FileSystemOptions`, in the teacher's `ConfigBuilder` style:
/// chained setters starting from sane defaults, with a validating `build`.
#[derive(Debug, Clone, Default)]
pub struct FileSystemOptionsBuilder {
    opts: FileSystemOptions,
}

impl FileSystemOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.opts.domain = Some(domain.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.opts.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = Some(password.into());
        self
    }

    pub fn watchservice_enabled(mut self, enabled: bool) -> Self {
        self.opts.watchservice_enabled = enabled;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.opts.poll_interval = Some(interval);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.passthrough.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> FileSystemOptions {
        self.opts
    }

    pub fn build_validated(self) -> Result<FileSystemOptions, SmbError> {
        if let Some(interval) = self.opts.poll_interval {
            if interval.is_zero() {
                return Err(SmbError::InvalidArgument(
                    "smb.watchservice.pollInterval must be greater than zero".to_string(),
                ));
            }
        }
        Ok(self.opts)
    }
}
