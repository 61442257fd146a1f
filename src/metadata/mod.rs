//! Project metadata provider.
//!
//! The release flow only needs the primary package's version, but the
//! provider contract returns the package list so the extraction rule lives in
//! one place ([`crate::version::resolve_version`]).

use crate::cli::TimeoutConfig;
use crate::error::MetadataError;
use crate::process::{self, OutputMode, RunError};
use cargo_metadata::MetadataCommand;
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Structured description of the project's packages
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Packages in manifest order; the first one is the primary package
    #[serde(default)]
    pub packages: Vec<PackageSummary>,
}

/// The fields of a package entry this tool reads
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PackageSummary {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,
    /// Package version, passed through unmodified
    #[serde(default)]
    pub version: Option<String>,
}

impl ProjectMetadata {
    /// Parse a bare `{"packages": [...]}` document.
    ///
    /// Only the fields read here are required, so hand-written documents
    /// work as well as full `cargo metadata` output.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        // A document without a `packages` key is malformed, not an empty project.
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| MetadataError::Malformed {
                reason: format!("invalid JSON: {}", e),
            })?;

        if value.get("packages").is_none() {
            return Err(MetadataError::Malformed {
                reason: "missing 'packages' field".to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| MetadataError::Malformed {
            reason: e.to_string(),
        })
    }
}

impl From<cargo_metadata::Metadata> for ProjectMetadata {
    fn from(metadata: cargo_metadata::Metadata) -> Self {
        let packages = metadata
            .packages
            .into_iter()
            .map(|package| PackageSummary {
                name: Some(package.name.as_str().to_string()),
                version: Some(package.version.to_string()),
            })
            .collect();
        Self { packages }
    }
}

/// Source of project metadata
pub trait MetadataProvider {
    /// Describe the project's packages without resolving dependencies
    fn describe_packages(&self) -> impl Future<Output = Result<ProjectMetadata, MetadataError>>;
}

/// Metadata provider backed by `cargo metadata`
#[derive(Debug, Clone)]
pub struct CargoMetadataProvider {
    manifest_path: Option<PathBuf>,
    timeout: Duration,
}

impl CargoMetadataProvider {
    /// Create a provider for the project in the current directory
    pub fn new() -> Self {
        Self {
            manifest_path: None,
            timeout: TimeoutConfig::default().metadata,
        }
    }

    /// Read a specific manifest instead of discovering one from the working directory
    pub fn with_manifest_path(mut self, manifest_path: Option<PathBuf>) -> Self {
        self.manifest_path = manifest_path;
        self
    }

    /// Bound the query duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `cargo metadata --format-version 1 --no-deps [--manifest-path <path>]`.
    ///
    /// Cargo is taken from `CARGO` when set (as under `cargo run`), otherwise
    /// from `PATH`.
    fn command(&self) -> Command {
        let mut metadata = MetadataCommand::new();
        metadata.no_deps();
        if let Some(manifest_path) = &self.manifest_path {
            metadata.manifest_path(manifest_path);
        }
        Command::from(metadata.cargo_command())
    }
}

impl Default for CargoMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for CargoMetadataProvider {
    async fn describe_packages(&self) -> Result<ProjectMetadata, MetadataError> {
        let mut command = self.command();
        let description = process::describe(&command);

        let output = process::run_tool(&mut command, self.timeout, OutputMode::Capture)
            .await
            .map_err(|e| match e {
                RunError::TimedOut => MetadataError::TimedOut {
                    command: description.clone(),
                    timeout: self.timeout,
                },
                other => MetadataError::ProviderUnavailable {
                    command: description.clone(),
                    reason: other.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(MetadataError::ProviderFailed {
                command: description,
                exit_code: output.exit_code(),
                diagnostics: output.stderr,
            });
        }

        let metadata = MetadataCommand::parse(&output.stdout).map_err(|e| {
            MetadataError::Malformed {
                reason: e.to_string(),
            }
        })?;
        Ok(ProjectMetadata::from(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_cargo_metadata_shape() {
        let json = r#"{
            "packages": [
                {"name": "myapp", "version": "2.1.0", "id": "path+file:///src/myapp#2.1.0", "dependencies": []},
                {"name": "helper", "version": "0.3.0"}
            ],
            "workspace_members": [],
            "version": 1
        }"#;

        let metadata = ProjectMetadata::from_json(json).expect("valid metadata");
        assert_eq!(metadata.packages.len(), 2);
        assert_eq!(metadata.packages[0].name.as_deref(), Some("myapp"));
        assert_eq!(metadata.packages[0].version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_package_without_version_is_kept() {
        let metadata = ProjectMetadata::from_json(r#"{"packages":[{"name":"x"}]}"#)
            .expect("valid metadata");
        assert_eq!(metadata.packages[0].version, None);
    }

    #[test]
    fn test_missing_packages_is_malformed() {
        let result = ProjectMetadata::from_json(r#"{"version":1}"#);
        assert!(matches!(result, Err(MetadataError::Malformed { .. })));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let result = ProjectMetadata::from_json("error: could not find `Cargo.toml`");
        assert!(matches!(result, Err(MetadataError::Malformed { .. })));
    }

    #[test]
    fn test_non_string_version_is_malformed() {
        let result = ProjectMetadata::from_json(r#"{"packages":[{"version":2}]}"#);
        assert!(matches!(result, Err(MetadataError::Malformed { .. })));
    }

    #[test]
    fn test_command_line() {
        let provider = CargoMetadataProvider::new()
            .with_manifest_path(Some(PathBuf::from("app/Cargo.toml")));
        let command = provider.command();
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args.first().map(String::as_str), Some("metadata"));
        assert!(args.windows(2).any(|w| w == ["--format-version", "1"]));
        assert!(args.iter().any(|arg| arg == "--no-deps"));
        assert!(args.windows(2).any(|w| w == ["--manifest-path", "app/Cargo.toml"]));
    }

    #[test]
    fn test_default_timeout_matches_timeout_config() {
        let provider = CargoMetadataProvider::default();
        assert_eq!(provider.timeout, TimeoutConfig::default().metadata);
    }

    #[tokio::test]
    async fn test_reads_primary_package_from_cargo() {
        let project = tempfile::TempDir::new().expect("Failed to create temp dir");
        std::fs::write(
            project.path().join("Cargo.toml"),
            "[package]\nname = \"scratch-app\"\nversion = \"1.2.3-rc.1\"\nedition = \"2021\"\n\n[workspace]\n",
        )
        .expect("write Cargo.toml");
        std::fs::create_dir(project.path().join("src")).expect("create src");
        std::fs::write(project.path().join("src/lib.rs"), "").expect("write lib.rs");

        let provider = CargoMetadataProvider::new()
            .with_manifest_path(Some(project.path().join("Cargo.toml")));
        let metadata = provider.describe_packages().await.expect("cargo metadata");

        assert_eq!(metadata.packages.len(), 1);
        assert_eq!(metadata.packages[0].name.as_deref(), Some("scratch-app"));
        assert_eq!(metadata.packages[0].version.as_deref(), Some("1.2.3-rc.1"));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_provider_failure() {
        let empty = tempfile::TempDir::new().expect("Failed to create temp dir");
        let provider = CargoMetadataProvider::new()
            .with_manifest_path(Some(empty.path().join("Cargo.toml")));

        match provider.describe_packages().await {
            Err(MetadataError::ProviderFailed { diagnostics, .. }) => {
                assert!(!diagnostics.trim().is_empty());
            }
            other => panic!("expected provider failure, got {:?}", other),
        }
    }
}
