//! Version resolution from project metadata.
//!
//! The resolved [`Version`] is the only value that flows between pipeline
//! steps. It is taken verbatim from the primary package and never defaulted.

use crate::error::MetadataError;
use crate::metadata::MetadataProvider;
use std::fmt;

/// Version string used as the image tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Wrap a version string; `None` when it is empty or only whitespace
    pub fn new(version: impl Into<String>) -> Option<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            None
        } else {
            Some(Self(version))
        }
    }

    /// The version exactly as provided
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string is usable as a container image tag
    ///
    /// Tags are `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`; notably `+build` metadata is not allowed.
    pub fn is_valid_tag(&self) -> bool {
        let mut chars = self.0.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        first_ok
            && self.0.len() <= 128
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::new(s).ok_or_else(|| "version must not be empty".to_string())
    }
}

/// Resolve the current project version.
///
/// Queries `provider` exactly once and returns `packages[0].version`
/// unmodified. Versions that are not semver, or not valid as a tag, are
/// logged but still returned; the build engine decides whether it accepts them.
pub async fn resolve_version<M: MetadataProvider>(provider: &M) -> Result<Version, MetadataError> {
    let metadata = provider.describe_packages().await?;

    let package = metadata.packages.first().ok_or(MetadataError::NoPackages)?;

    let version = package
        .version
        .clone()
        .and_then(Version::new)
        .ok_or_else(|| MetadataError::MissingVersion {
            package: package
                .name
                .clone()
                .unwrap_or_else(|| "<unnamed>".to_string()),
        })?;

    if let Err(e) = semver::Version::parse(version.as_str()) {
        log::warn!("Version '{}' is not valid semver: {}", version, e);
    }
    if !version.is_valid_tag() {
        log::warn!(
            "Version '{}' contains characters not allowed in an image tag",
            version
        );
    }

    log::info!("Resolved version {}", version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PackageSummary, ProjectMetadata};

    /// `None` behaves like `cargo metadata` exiting with status 1
    struct StaticMetadata(Option<ProjectMetadata>);

    impl MetadataProvider for StaticMetadata {
        async fn describe_packages(&self) -> Result<ProjectMetadata, MetadataError> {
            self.0.clone().ok_or_else(|| MetadataError::ProviderFailed {
                command: "cargo metadata".to_string(),
                exit_code: 1,
                diagnostics: String::new(),
            })
        }
    }

    fn packages(entries: &[(Option<&str>, Option<&str>)]) -> StaticMetadata {
        StaticMetadata(Some(ProjectMetadata {
            packages: entries
                .iter()
                .map(|(name, version)| PackageSummary {
                    name: name.map(String::from),
                    version: version.map(String::from),
                })
                .collect(),
        }))
    }

    #[tokio::test]
    async fn test_first_package_wins() {
        let provider = packages(&[(Some("app"), Some("2.1.0")), (Some("lib"), Some("9.9.9"))]);
        let version = resolve_version(&provider).await.expect("version");
        assert_eq!(version.as_str(), "2.1.0");
    }

    #[tokio::test]
    async fn test_version_is_not_normalized() {
        let provider = packages(&[(Some("app"), Some("1.0.0-rc.1+build.5"))]);
        let version = resolve_version(&provider).await.expect("version");
        assert_eq!(version.to_string(), "1.0.0-rc.1+build.5");
    }

    #[tokio::test]
    async fn test_no_packages() {
        let provider = packages(&[]);
        let result = resolve_version(&provider).await;
        assert!(matches!(result, Err(MetadataError::NoPackages)));
    }

    #[tokio::test]
    async fn test_missing_version() {
        let provider = packages(&[(Some("app"), None)]);
        match resolve_version(&provider).await {
            Err(MetadataError::MissingVersion { package }) => assert_eq!(package, "app"),
            other => panic!("expected MissingVersion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_version_is_missing() {
        let provider = packages(&[(None, Some(""))]);
        match resolve_version(&provider).await {
            Err(MetadataError::MissingVersion { package }) => assert_eq!(package, "<unnamed>"),
            other => panic!("expected MissingVersion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_is_surfaced() {
        let provider = StaticMetadata(None);
        let result = resolve_version(&provider).await;
        assert!(matches!(result, Err(MetadataError::ProviderFailed { exit_code: 1, .. })));
    }

    #[test]
    fn test_tag_validity() {
        assert!(Version::new("2.1.0").is_some_and(|v| v.is_valid_tag()));
        assert!(Version::new("1.0.0-rc.1").is_some_and(|v| v.is_valid_tag()));
        assert!(!Version::new("1.0.0+build").is_some_and(|v| v.is_valid_tag()));
        assert!(!Version::new(".1").is_some_and(|v| v.is_valid_tag()));
    }

    #[test]
    fn test_empty_version_rejected() {
        assert!(Version::new("").is_none());
        assert!(Version::new("   ").is_none());
        assert!("".parse::<Version>().is_err());
        assert_eq!("0.9.9".parse::<Version>().map(|v| v.to_string()), Ok("0.9.9".to_string()));
    }
}
