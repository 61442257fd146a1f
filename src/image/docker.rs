//! The `docker` command line as build engine and registry client.

use super::{BuildEngine, ImageReference, RegistryClient};
use crate::cli::OutputManager;
use crate::error::{BuildError, PushError};
use crate::process::{self, OutputMode, RunError};
use crate::{RegistryAuth, TimeoutConfig};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Timeout for the `docker info` daemon probe
pub const DOCKER_INFO_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(target_os = "macos")]
const DOCKER_START_HELP: &str = "Start Docker Desktop from Applications or Spotlight";

#[cfg(target_os = "linux")]
const DOCKER_START_HELP: &str = "Start Docker daemon: sudo systemctl start docker";

#[cfg(target_os = "windows")]
const DOCKER_START_HELP: &str = "Start Docker Desktop from the Start menu";

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const DOCKER_START_HELP: &str = "Start the Docker daemon";

/// Checks that the Docker daemon answers `docker info`.
///
/// # Returns
///
/// * `Ok(())` - Daemon is reachable
/// * `Err(reason)` - Daemon is down, hung, or the binary cannot run
pub async fn check_docker_available(docker: &Path) -> Result<(), String> {
    let status_result = timeout(
        DOCKER_INFO_TIMEOUT,
        Command::new(docker)
            .arg("info")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status(),
    )
    .await;

    match status_result {
        Err(_) => Err(format!(
            "Docker daemon check timed out after {} seconds. {}",
            DOCKER_INFO_TIMEOUT.as_secs(),
            DOCKER_START_HELP
        )),
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(format!(
            "Docker daemon is not responding (exit code: {}). {}",
            status.code().unwrap_or(-1),
            DOCKER_START_HELP
        )),
        Ok(Err(e)) => Err(format!("Cannot run {}: {}", docker.display(), e)),
    }
}

/// Build engine and registry client backed by the `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker: Option<PathBuf>,
    context_dir: PathBuf,
    dockerfile: Option<PathBuf>,
    registry: RegistryAuth,
    timeouts: TimeoutConfig,
    output: OutputManager,
}

impl DockerCli {
    /// Create a Docker client for the given build context
    pub fn new(context_dir: impl Into<PathBuf>, output: OutputManager) -> Self {
        Self {
            docker: None,
            context_dir: context_dir.into(),
            dockerfile: None,
            registry: RegistryAuth::default(),
            timeouts: TimeoutConfig::default(),
            output,
        }
    }

    /// Use a Dockerfile other than `<context>/Dockerfile`
    pub fn with_dockerfile(mut self, dockerfile: Option<PathBuf>) -> Self {
        self.dockerfile = dockerfile;
        self
    }

    /// Registry settings forwarded to `docker push`
    pub fn with_registry(mut self, registry: RegistryAuth) -> Self {
        self.registry = registry;
        self
    }

    /// Build and push time limits
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Run this binary instead of the `docker` found on `PATH`
    pub fn with_docker_binary(mut self, docker: Option<PathBuf>) -> Self {
        self.docker = docker;
        self
    }

    fn docker_binary(&self) -> Result<PathBuf, which::Error> {
        match &self.docker {
            Some(docker) => Ok(docker.clone()),
            None => which::which("docker"),
        }
    }

    fn build_command(&self, docker: &Path, reference: &ImageReference) -> Command {
        let mut command = Command::new(docker);
        command.arg("build").arg("-t").arg(reference.to_string());
        if let Some(dockerfile) = &self.dockerfile {
            command.arg("-f").arg(dockerfile);
        }
        command.arg(&self.context_dir);
        command
    }

    fn push_command(&self, docker: &Path, reference: &ImageReference) -> Command {
        let mut command = Command::new(docker);
        command.arg("push").arg(reference.to_string());
        if let Some(config_dir) = &self.registry.docker_config {
            command.env("DOCKER_CONFIG", config_dir);
        }
        command
    }
}

impl BuildEngine for DockerCli {
    async fn build(&self, reference: &ImageReference) -> Result<(), BuildError> {
        let docker = self.docker_binary().map_err(|e| BuildError::EngineUnavailable {
            reason: format!("docker not found: {}", e),
        })?;

        check_docker_available(&docker)
            .await
            .map_err(|reason| BuildError::EngineUnavailable { reason })?;

        let _ = self.output.progress(&format!("Building {}...", reference));

        let mut command = self.build_command(&docker, reference);
        let result = process::run_tool(
            &mut command,
            self.timeouts.build,
            OutputMode::Stream(&self.output),
        )
        .await;

        let output = match result {
            Ok(output) => output,
            Err(RunError::TimedOut) => {
                let _ = self.output.warn("Docker build timed out, process terminated");
                return Err(BuildError::TimedOut {
                    reference: reference.to_string(),
                    timeout: self.timeouts.build,
                });
            }
            Err(e) => {
                return Err(BuildError::EngineUnavailable {
                    reason: format!("docker build {}", e),
                });
            }
        };

        if !output.status.success() {
            return Err(BuildError::BuildFailed {
                reference: reference.to_string(),
                exit_code: output.exit_code(),
                diagnostics: output.stderr,
            });
        }

        let _ = self.output.success(&format!("Built {}", reference));
        Ok(())
    }
}

impl RegistryClient for DockerCli {
    async fn push(&self, reference: &ImageReference) -> Result<(), PushError> {
        let docker = self.docker_binary().map_err(|e| PushError::ClientUnavailable {
            reason: format!("docker not found: {}", e),
        })?;

        let _ = self.output.progress(&format!("Pushing {}...", reference));

        let mut command = self.push_command(&docker, reference);
        let result = process::run_tool(
            &mut command,
            self.timeouts.push,
            OutputMode::Stream(&self.output),
        )
        .await;

        let output = match result {
            Ok(output) => output,
            Err(RunError::TimedOut) => {
                let _ = self.output.warn("Docker push timed out, process terminated");
                return Err(PushError::TimedOut {
                    reference: reference.to_string(),
                    timeout: self.timeouts.push,
                });
            }
            Err(e) => {
                return Err(PushError::ClientUnavailable {
                    reason: format!("docker push {}", e),
                });
            }
        };

        if !output.status.success() {
            return Err(PushError::PushFailed {
                reference: reference.to_string(),
                exit_code: output.exit_code(),
                diagnostics: output.stderr,
            });
        }

        let _ = self.output.success(&format!("Pushed {}", reference));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn reference() -> ImageReference {
        let version = Version::new("2.1.0").expect("non-empty version");
        ImageReference::new("myapp", version).expect("valid reference")
    }

    #[test]
    fn test_build_command_tags_once() {
        let docker = DockerCli::new(".", OutputManager::new(true));
        let command = docker.build_command(Path::new("docker"), &reference());
        assert_eq!(process::describe(&command), "docker build -t myapp:2.1.0 .");
    }

    #[test]
    fn test_build_command_with_dockerfile() {
        let docker = DockerCli::new("app", OutputManager::new(true))
            .with_dockerfile(Some(PathBuf::from("docker/Dockerfile.release")));
        let command = docker.build_command(Path::new("docker"), &reference());
        assert_eq!(
            process::describe(&command),
            "docker build -t myapp:2.1.0 -f docker/Dockerfile.release app"
        );
    }

    #[test]
    fn test_push_command_forwards_docker_config() {
        let docker = DockerCli::new(".", OutputManager::new(true)).with_registry(
            RegistryAuth {
                docker_config: Some(PathBuf::from("/run/secrets/docker")),
            },
        );
        let command = docker.push_command(Path::new("docker"), &reference());
        assert_eq!(process::describe(&command), "docker push myapp:2.1.0");

        let forwarded = command
            .as_std()
            .get_envs()
            .find(|(key, _)| *key == "DOCKER_CONFIG")
            .and_then(|(_, value)| value);
        assert_eq!(forwarded, Some(std::ffi::OsStr::new("/run/secrets/docker")));
    }

    #[test]
    fn test_push_command_without_config_sets_no_env() {
        let docker = DockerCli::new(".", OutputManager::new(true));
        let command = docker.push_command(Path::new("docker"), &reference());
        assert_eq!(command.as_std().get_envs().count(), 0);
    }

    #[cfg(unix)]
    mod stub {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Writes an executable `docker` that answers `info` and logs every call
        fn stub_docker(dir: &TempDir, build: &str, push: &str) -> PathBuf {
            let path = dir.path().join("docker");
            let script = format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> \"$(dirname \"$0\")/calls.log\"\n\
                 case \"$1\" in\n\
                   info) exit 0 ;;\n\
                   build) {} ;;\n\
                   push) {} ;;\n\
                 esac\n",
                build, push
            );
            fs::write(&path, script).expect("write stub docker");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub docker");
            path
        }

        fn calls(dir: &TempDir) -> Vec<String> {
            fs::read_to_string(dir.path().join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn client(docker: PathBuf, timeouts: TimeoutConfig) -> DockerCli {
            DockerCli::new("ctx", OutputManager::new(true))
                .with_docker_binary(Some(docker))
                .with_timeouts(timeouts)
        }

        #[tokio::test]
        async fn test_build_and_push_use_the_same_tag() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let docker = client(stub_docker(&dir, "exit 0", "exit 0"), TimeoutConfig::default());

            docker.build(&reference()).await.expect("build succeeds");
            docker.push(&reference()).await.expect("push succeeds");

            assert_eq!(
                calls(&dir),
                vec!["info", "build -t myapp:2.1.0 ctx", "push myapp:2.1.0"]
            );
        }

        #[tokio::test]
        async fn test_failed_build_carries_exit_code_and_diagnostics() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let docker = client(
                stub_docker(
                    &dir,
                    "echo 'Step 1/2 : FROM rust'; echo 'error: missing dependency foo' >&2; exit 17",
                    "exit 0",
                ),
                TimeoutConfig::default(),
            );

            match docker.build(&reference()).await {
                Err(BuildError::BuildFailed {
                    reference,
                    exit_code,
                    diagnostics,
                }) => {
                    assert_eq!(reference, "myapp:2.1.0");
                    assert_eq!(exit_code, 17);
                    assert!(diagnostics.contains("missing dependency foo"));
                }
                other => panic!("expected build failure, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_rejected_push_carries_registry_diagnostics() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let docker = client(
                stub_docker(
                    &dir,
                    "exit 0",
                    "echo 'tag invalid: The image tag 3.0.0 already exists and cannot be overwritten' >&2; exit 1",
                ),
                TimeoutConfig::default(),
            );

            match docker.push(&reference()).await {
                Err(PushError::PushFailed {
                    exit_code,
                    diagnostics,
                    ..
                }) => {
                    assert_eq!(exit_code, 1);
                    assert!(diagnostics.contains("cannot be overwritten"));
                }
                other => panic!("expected push failure, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_hung_build_times_out() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let timeouts = TimeoutConfig {
                build: Duration::from_millis(300),
                ..TimeoutConfig::default()
            };
            let docker = client(stub_docker(&dir, "exec sleep 30", "exit 0"), timeouts);

            let result = docker.build(&reference()).await;
            assert!(matches!(result, Err(BuildError::TimedOut { .. })), "{:?}", result);
        }

        #[tokio::test]
        async fn test_hung_push_times_out() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let timeouts = TimeoutConfig {
                push: Duration::from_millis(300),
                ..TimeoutConfig::default()
            };
            let docker = client(stub_docker(&dir, "exit 0", "exec sleep 30"), timeouts);

            let result = docker.push(&reference()).await;
            assert!(matches!(result, Err(PushError::TimedOut { .. })), "{:?}", result);
        }

        #[tokio::test]
        async fn test_engine_down_fails_before_building() {
            let dir = TempDir::new().expect("Failed to create temp dir");
            let path = dir.path().join("docker");
            fs::write(&path, "#!/bin/sh\necho \"$@\" >> \"$(dirname \"$0\")/calls.log\"\nexit 1\n")
                .expect("write stub docker");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub docker");

            let result = client(path, TimeoutConfig::default()).build(&reference()).await;
            assert!(matches!(result, Err(BuildError::EngineUnavailable { .. })), "{:?}", result);
            assert_eq!(calls(&dir), vec!["info"]);
        }
    }
}
