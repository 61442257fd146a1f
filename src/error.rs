//! Error types for image release operations.
//!
//! Each pipeline step has its own error enum so the failing step can always be
//! identified. All of them are fatal: nothing is retried or downgraded.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for image release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all image release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Version resolution failed
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Image construction failed
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Registry upload failed
    #[error("Push error: {0}")]
    Push(#[from] PushError),

    /// CLI argument or configuration errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// A pipeline value was asked to run a second time
    #[error("Release pipeline already ran (final state: {state}); start a new run to retry")]
    AlreadyRan {
        /// Terminal state the pipeline ended in
        state: String,
    },
}

/// Version resolution errors
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Metadata provider could not be started or located
    #[error("Metadata provider unavailable: {command} - {reason}")]
    ProviderUnavailable {
        /// Command that was attempted
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Metadata provider exited unsuccessfully
    #[error("'{command}' failed with exit code {exit_code}{}", diagnostics_suffix(.diagnostics))]
    ProviderFailed {
        /// Command that failed
        command: String,
        /// Process exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Captured stderr, verbatim
        diagnostics: String,
    },

    /// Metadata provider did not finish in time
    #[error("'{command}' timed out after {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Command that timed out
        command: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Output was not the expected JSON document
    #[error("Malformed metadata: {reason}")]
    Malformed {
        /// Reason for the error
        reason: String,
    },

    /// The package list was empty
    #[error("Metadata lists no packages")]
    NoPackages,

    /// The primary package has no usable version
    #[error("Package '{package}' has no version field")]
    MissingVersion {
        /// Package name, or `<unnamed>`
        package: String,
    },
}

/// Image construction errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Configured image name cannot form a tag
    #[error("Invalid image name '{name}': {reason}")]
    InvalidImageName {
        /// Image name as configured
        name: String,
        /// Reason for the error
        reason: String,
    },

    /// Build engine could not be reached
    #[error("Build engine unavailable: {reason}")]
    EngineUnavailable {
        /// Reason for the error
        reason: String,
    },

    /// Build engine reported a failure
    #[error("Building '{reference}' failed with exit code {exit_code}{}", diagnostics_suffix(.diagnostics))]
    BuildFailed {
        /// Image reference being built
        reference: String,
        /// Process exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Captured stderr, verbatim
        diagnostics: String,
    },

    /// Build did not finish in time
    #[error("Building '{reference}' timed out after {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Image reference being built
        reference: String,
        /// Configured timeout
        timeout: Duration,
    },
}

/// Registry upload errors
#[derive(Error, Debug)]
pub enum PushError {
    /// Registry client could not be started
    #[error("Registry client unavailable: {reason}")]
    ClientUnavailable {
        /// Reason for the error
        reason: String,
    },

    /// Registry client reported a failure (auth, network, rejected tag)
    #[error("Pushing '{reference}' failed with exit code {exit_code}{}", diagnostics_suffix(.diagnostics))]
    PushFailed {
        /// Image reference being pushed
        reference: String,
        /// Process exit code (-1 when killed by a signal)
        exit_code: i32,
        /// Captured stderr, verbatim
        diagnostics: String,
    },

    /// Push did not finish in time
    #[error("Pushing '{reference}' timed out after {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Image reference being pushed
        reference: String,
        /// Configured timeout
        timeout: Duration,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{}", trimmed)
    }
}

impl ReleaseError {
    /// Name of the step that failed, as shown to the user
    pub fn step(&self) -> &'static str {
        match self {
            ReleaseError::Metadata(_) => "metadata",
            ReleaseError::Build(_) => "build",
            ReleaseError::Push(_) => "push",
            ReleaseError::Cli(_) | ReleaseError::AlreadyRan { .. } => "cli",
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::Cli(_) => 2,
            _ => 1,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Metadata(MetadataError::ProviderUnavailable { .. }) => vec![
                "Ensure cargo is installed and on PATH (or set CARGO)".to_string(),
            ],
            ReleaseError::Metadata(MetadataError::ProviderFailed { .. }) => vec![
                "Run from a directory containing Cargo.toml, or pass --manifest-path".to_string(),
            ],
            ReleaseError::Build(BuildError::EngineUnavailable { .. })
            | ReleaseError::Push(PushError::ClientUnavailable { .. }) => vec![
                "Start the Docker daemon and check it with: docker info".to_string(),
                "Install Docker from https://docs.docker.com/get-docker/ if missing".to_string(),
            ],
            ReleaseError::Build(BuildError::InvalidImageName { .. }) => vec![
                "Pass a repository name such as --image-name registry.example.com/team/app"
                    .to_string(),
            ],
            ReleaseError::Push(PushError::PushFailed { diagnostics, .. })
                if mentions_auth(diagnostics) =>
            {
                vec![
                    "Log in to the registry: docker login <registry>".to_string(),
                    "Pass --docker-config if credentials live outside ~/.docker".to_string(),
                ]
            }
            ReleaseError::Push(PushError::PushFailed { .. }) => vec![
                "If the tag is immutable and already exists, bump the version in Cargo.toml"
                    .to_string(),
                "The locally built image is kept; re-running will rebuild it".to_string(),
            ],
            _ => vec![],
        }
    }
}

fn mentions_auth(diagnostics: &str) -> bool {
    let lower = diagnostics.to_ascii_lowercase();
    ["unauthorized", "authentication required", "denied"]
        .iter()
        .any(|needle| lower.contains(needle))
}
