//! # Kodegen Image Release
//!
//! Version-synchronized container image releases for Rust projects.
//!
//! The crate does three things, in a fixed order:
//!
//! 1. resolve the project version from `cargo metadata`;
//! 2. build a container image tagged `<image_name>:<version>`;
//! 3. push exactly that tag.
//!
//! A push always builds first, and always with the version resolved at the
//! start of that same run. Each external tool sits behind a trait
//! ([`MetadataProvider`], [`BuildEngine`], [`RegistryClient`]) so the
//! pipeline can be driven by fakes in tests.
//!
//! ## Usage
//!
//! ```bash
//! kodegen_image_release get-version
//! kodegen_image_release --image-name ghcr.io/acme/app build --version 1.4.2
//! kodegen_image_release --image-name ghcr.io/acme/app push
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod image;
pub mod metadata;
pub mod pipeline;
mod process;
pub mod version;

pub use cli::{Args, OutputManager, TimeoutConfig};
pub use error::{BuildError, CliError, MetadataError, PushError, ReleaseError, Result};
pub use image::{BuildEngine, DockerCli, ImageReference, RegistryClient, build_image, push_image};
pub use metadata::{CargoMetadataProvider, MetadataProvider, PackageSummary, ProjectMetadata};
pub use pipeline::{PipelineState, ReleaseOutcome, ReleasePipeline, release};
pub use version::{Version, resolve_version};

use std::path::PathBuf;

/// Registry settings handed to the registry client without interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    /// Docker client config directory (exported as `DOCKER_CONFIG` to `docker push`)
    pub docker_config: Option<PathBuf>,
}

/// Configuration for build and release operations
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Image repository the version tag is appended to
    pub image_name: String,
    /// Build context directory
    pub context_dir: PathBuf,
    /// Dockerfile, when not `<context_dir>/Dockerfile`
    pub dockerfile: Option<PathBuf>,
    /// Manifest to read the version from, when not discovered from the working directory
    pub manifest_path: Option<PathBuf>,
    /// Registry credentials, forwarded opaquely
    pub registry: RegistryAuth,
    /// Limits for external tool calls
    pub timeouts: TimeoutConfig,
}

impl ReleaseConfig {
    /// Create a configuration with defaults for everything but the image name
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            context_dir: PathBuf::from("."),
            dockerfile: None,
            manifest_path: None,
            registry: RegistryAuth::default(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Metadata provider reading this configuration's manifest
    pub fn metadata_provider(&self) -> CargoMetadataProvider {
        CargoMetadataProvider::new()
            .with_manifest_path(self.manifest_path.clone())
            .with_timeout(self.timeouts.metadata)
    }

    /// Docker client for this configuration's build context and registry
    pub fn docker(&self, output: OutputManager) -> DockerCli {
        DockerCli::new(self.context_dir.clone(), output)
            .with_dockerfile(self.dockerfile.clone())
            .with_registry(self.registry.clone())
            .with_timeouts(self.timeouts)
    }
}
