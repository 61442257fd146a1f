//! Command line argument parsing and validation.
//!
//! Every option has an environment fallback so CI jobs can configure the tool
//! without repeating flags.

use super::{OutputManager, TimeoutConfig};
use crate::error::{CliError, Result};
use crate::metadata::CargoMetadataProvider;
use crate::version::Version;
use crate::{RegistryAuth, ReleaseConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build and push container images tagged with the project version
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_image_release",
    version,
    about = "Build and push container images tagged with the Cargo package version",
    long_about = "Build and push container images tagged with the Cargo package version.

The tag is always `<image-name>:<version>`, where the version is read from
`cargo metadata`. `push` resolves the version once, builds that tag, then
pushes exactly that tag.

Usage:
  kodegen_image_release get-version
  kodegen_image_release --image-name ghcr.io/acme/app build --version 1.4.2
  kodegen_image_release --image-name ghcr.io/acme/app push"
)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Image repository, without a tag (e.g. ghcr.io/acme/app)
    #[arg(long, global = true, env = "IMAGE_NAME", value_name = "NAME")]
    pub image_name: Option<String>,

    /// Build context directory
    #[arg(long, global = true, env = "BUILD_CONTEXT", default_value = ".", value_name = "DIR")]
    pub context: PathBuf,

    /// Dockerfile path (defaults to <context>/Dockerfile)
    #[arg(long, global = true, env = "DOCKERFILE", value_name = "PATH")]
    pub dockerfile: Option<PathBuf>,

    /// Cargo.toml to read the version from
    #[arg(long, global = true, env = "MANIFEST_PATH", value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Docker client configuration directory holding registry credentials
    #[arg(long, global = true, env = "DOCKER_CONFIG", value_name = "DIR")]
    pub docker_config: Option<PathBuf>,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the image tagged with an explicit version (no metadata lookup, no push)
    Build {
        /// Version to tag the image with
        #[arg(long, value_name = "VERSION")]
        version: Version,
    },

    /// Resolve the version, build the image with it, and push that tag
    Push,

    /// Print the version read from project metadata
    #[command(alias = "get_version")]
    GetVersion,
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Push => "push",
            Command::GetVersion => "get-version",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Configuration for commands that build an image.
    ///
    /// Fails when no image name was given by flag or `IMAGE_NAME`, or when the
    /// given one is blank.
    pub fn release_config(&self, timeouts: TimeoutConfig) -> Result<ReleaseConfig> {
        let image_name = match &self.image_name {
            None => {
                return Err(CliError::MissingArgument {
                    argument: "--image-name (or IMAGE_NAME)".to_string(),
                }
                .into());
            }
            Some(name) if name.trim().is_empty() => {
                return Err(CliError::InvalidArguments {
                    reason: "--image-name must not be empty".to_string(),
                }
                .into());
            }
            Some(name) => name.clone(),
        };

        Ok(self.config(image_name, timeouts))
    }

    /// Metadata provider for the manifest these arguments select.
    ///
    /// Needs no image name, so `get-version` works without one.
    pub fn metadata_provider(&self, timeouts: TimeoutConfig) -> CargoMetadataProvider {
        self.config(String::new(), timeouts).metadata_provider()
    }

    fn config(&self, image_name: String, timeouts: TimeoutConfig) -> ReleaseConfig {
        ReleaseConfig {
            image_name,
            context_dir: self.context.clone(),
            dockerfile: self.dockerfile.clone(),
            manifest_path: self.manifest_path.clone(),
            registry: RegistryAuth {
                docker_config: self.docker_config.clone(),
            },
            timeouts,
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: OutputManager,
    /// Limits for external tool calls
    pub timeouts: TimeoutConfig,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(quiet: bool, timeouts: TimeoutConfig) -> Self {
        Self {
            output: OutputManager::new(quiet),
            timeouts,
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        // get-version owns stdout: only the version may be printed there.
        let quiet = args.quiet || matches!(args.command, Command::GetVersion);
        Self::new(quiet, TimeoutConfig::from_env())
    }
}
