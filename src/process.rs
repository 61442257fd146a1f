//! Bounded execution of external tools.
//!
//! Every collaborator (cargo, docker) is driven through [`run_tool`], which
//! either captures both streams or relays them to the terminal as they arrive.

use crate::cli::OutputManager;
use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Number of stderr lines kept for error reports when streaming
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// How a tool's output is handled while it runs
#[derive(Clone, Copy)]
pub(crate) enum OutputMode<'a> {
    /// Collect stdout and stderr in full, print nothing
    Capture,
    /// Relay stdout through the output manager and stderr verbatim; keep a stderr tail
    Stream(&'a OutputManager),
}

/// Completed tool invocation
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Exit code, or -1 when the process was terminated by a signal
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Failure to obtain an exit status at all
#[derive(Debug)]
pub(crate) enum RunError {
    Spawn(std::io::Error),
    Wait(std::io::Error),
    TimedOut,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Spawn(e) => write!(f, "failed to start: {}", e),
            RunError::Wait(e) => write!(f, "failed while waiting: {}", e),
            RunError::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Renders a command line for messages (`program arg arg ...`)
pub(crate) fn describe(command: &Command) -> String {
    let std_command = command.as_std();
    std::iter::once(std_command.get_program())
        .chain(std_command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command` to completion, bounded by `limit`.
///
/// On timeout the child is killed and reaped before returning.
pub(crate) async fn run_tool(
    command: &mut Command,
    limit: Duration,
    mode: OutputMode<'_>,
) -> Result<ToolOutput, RunError> {
    log::debug!("Running: {}", describe(command));

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunError::Spawn)?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let outcome = tokio::time::timeout(limit, async {
        let (stdout, stderr) = tokio::join!(read_stdout(stdout, mode), read_stderr(stderr, mode));
        child.wait().await.map(|status| (status, stdout, stderr))
    })
    .await;

    match outcome {
        Ok(Ok((status, stdout, stderr))) => Ok(ToolOutput {
            status,
            stdout,
            stderr,
        }),
        Ok(Err(e)) => Err(RunError::Wait(e)),
        Err(_elapsed) => {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill timed out process: {}", e);
            }
            let _ = tokio::time::timeout(Duration::from_secs(10), child.wait()).await;
            Err(RunError::TimedOut)
        }
    }
}

async fn read_stdout<R: AsyncRead + Unpin>(stream: Option<R>, mode: OutputMode<'_>) -> String {
    let Some(stream) = stream else {
        return String::new();
    };

    match mode {
        OutputMode::Capture => read_all(stream).await,
        OutputMode::Stream(output) => {
            for_each_line(stream, |line| {
                let _ = output.indent(line);
            })
            .await;
            String::new()
        }
    }
}

async fn read_stderr<R: AsyncRead + Unpin>(stream: Option<R>, mode: OutputMode<'_>) -> String {
    let Some(stream) = stream else {
        return String::new();
    };

    match mode {
        OutputMode::Capture => read_all(stream).await,
        OutputMode::Stream(_) => {
            let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
            for_each_line(stream, |line| {
                eprintln!("{}", line);
                if tail.len() == DIAGNOSTIC_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            })
            .await;
            tail.into_iter().collect::<Vec<_>>().join("\n")
        }
    }
}

/// Feeds each line of `stream` to `handle` until EOF.
///
/// Bytes that are not UTF-8 are replaced, never fatal. The pipe is drained to
/// EOF even after a read error, so the child never writes into a closed pipe.
async fn for_each_line<R, F>(stream: R, mut handle: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                handle(line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                log::warn!("Failed to read process output: {}", e);
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    log::warn!("Failed to drain process output: {}", e);
                }
                return;
            }
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut stream: R) -> String {
    let mut bytes = Vec::new();
    if let Err(e) = stream.read_to_end(&mut bytes).await {
        log::warn!("Failed to read process output: {}", e);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
