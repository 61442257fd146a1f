//! Image building and pushing.
//!
//! Both operations take an [`ImageReference`], which is the only way to name
//! an image in this crate. A release builds a reference once and hands the
//! same value to the registry, so the pushed tag cannot drift from the built one.
//!
//! # Module Structure
//!
//! - `docker` - [`DockerCli`], the `docker` command line as build engine and registry client

mod docker;

pub use docker::{DOCKER_INFO_TIMEOUT, DockerCli, check_docker_available};

use crate::error::{BuildError, PushError};
use crate::version::Version;
use std::fmt;
use std::future::Future;

/// `image_name:version`, used verbatim for both build and push
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    name: String,
    version: Version,
}

impl ImageReference {
    /// Combine a configured image name with a version.
    ///
    /// The name must be non-empty and free of whitespace. It may carry a
    /// registry host with a port (`localhost:5000/app`), but not its own tag.
    pub fn new(name: &str, version: Version) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidImageName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("image name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("image name contains whitespace"));
        }
        // A ':' after the last '/' would be a tag, which this tool owns.
        let last_component = name.rsplit('/').next().unwrap_or(name);
        if last_component.contains(':') || last_component.contains('@') {
            return Err(invalid("image name must not include a tag or digest"));
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }

    /// Repository part
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag part
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Turns the build context into a locally stored, tagged image
pub trait BuildEngine {
    /// Build the context and tag the result exactly `reference`
    fn build(&self, reference: &ImageReference) -> impl Future<Output = Result<(), BuildError>>;
}

/// Uploads a locally tagged image to its registry
pub trait RegistryClient {
    /// Push the image tagged `reference`
    fn push(&self, reference: &ImageReference) -> impl Future<Output = Result<(), PushError>>;
}

/// Build an image tagged `image_name:version`.
///
/// The name is validated before the engine is touched. Rebuilding an
/// existing reference overwrites the local tag.
pub async fn build_image<B: BuildEngine>(
    engine: &B,
    image_name: &str,
    version: &Version,
) -> Result<ImageReference, BuildError> {
    let reference = ImageReference::new(image_name, version.clone())?;
    log::info!("Building image {}", reference);
    engine.build(&reference).await?;
    Ok(reference)
}

/// Push a previously built reference.
pub async fn push_image<R: RegistryClient>(
    registry: &R,
    reference: &ImageReference,
) -> Result<(), PushError> {
    log::info!("Pushing image {}", reference);
    registry.push(reference).await
}
