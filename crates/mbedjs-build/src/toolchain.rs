//! External build tool invocation.
//!
//! Commands run as child processes with stdout and stderr captured into a
//! single stream in arrival order, so a log reads the way a terminal would
//! have shown it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};

/// A command line and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ToolchainCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `make <goal>` in the staging directory.
    pub fn fetch(config: &BuildConfig) -> Self {
        Self::new(&config.toolchain.make, &config.layout.build_dir).arg(&config.toolchain.fetch_goal)
    }

    /// `make BOARD=<target> EXTRAS=<dirs>` in the staging directory.
    pub fn compile<'a>(config: &BuildConfig, extras: impl IntoIterator<Item = &'a str>) -> Self {
        let extras: Vec<&str> = extras.into_iter().collect();
        Self::new(&config.toolchain.make, &config.layout.build_dir)
            .arg(format!("BOARD={}", config.target.target))
            .arg(format!("EXTRAS={}", extras.join(" ")))
    }
}

impl fmt::Display for ToolchainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub output: Vec<u8>,
}

impl CommandOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Run `command`, capturing stdout and stderr together.
pub async fn run_captured(command: &ToolchainCommand) -> Result<CommandOutput> {
    info!(command = %command, cwd = %command.cwd.display(), "running toolchain command");
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| BuildError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut pumps = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(stderr, tx.clone())));
    }
    drop(tx);

    let mut output = Vec::new();
    while let Some(chunk) = rx.recv().await {
        output.extend_from_slice(&chunk);
    }
    for pump in pumps {
        pump.await?.map_err(|source| BuildError::Io {
            path: command.cwd.clone(),
            source,
        })?;
    }

    let status = child.wait().await.map_err(|source| BuildError::Spawn {
        command: command.to_string(),
        source,
    })?;
    debug!(command = %command, %status, bytes = output.len(), "toolchain command exited");
    Ok(CommandOutput { status, output })
}

async fn pump<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 || tx.send(buf[..n].to_vec()).is_err() {
            return Ok(());
        }
    }
}

/// Run `command` and fail unless it exits successfully. When `log` is given
/// the combined output is written there first, whatever the outcome.
pub async fn run_checked(command: &ToolchainCommand, log: Option<&Path>) -> Result<CommandOutput> {
    let result = run_captured(command).await?;
    if let Some(log) = log {
        if let Some(parent) = log.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        tokio::fs::write(log, &result.output)
            .await
            .map_err(|source| BuildError::Io {
                path: log.to_path_buf(),
                source,
            })?;
    }
    if !result.status.success() {
        return Err(BuildError::Toolchain {
            command: command.to_string(),
            status: result.status.to_string(),
            output: result.text(),
        });
    }
    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(dir: &Path, script: &str) -> ToolchainCommand {
        ToolchainCommand::new("sh", dir).arg("-c").arg(script)
    }

    #[test]
    fn display_joins_arguments() {
        let cmd = ToolchainCommand::new("make", "/tmp").arg("BOARD=K64F").arg("EXTRAS=a b");
        assert_eq!(cmd.to_string(), "make BOARD=K64F EXTRAS=a b");
    }

    #[tokio::test]
    async fn captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_captured(&sh(dir.path(), "echo out; echo err 1>&2")).await.unwrap();
        assert!(out.status.success());
        let text = out.text();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[tokio::test]
    async fn runs_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        run_checked(&sh(dir.path(), "touch marker"), None).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn failure_keeps_log_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("build.log");
        let err = run_checked(&sh(dir.path(), "echo compiling; echo boom 1>&2; exit 3"), Some(&log))
            .await
            .unwrap_err();

        match err {
            BuildError::Toolchain { output, status, .. } => {
                assert!(output.contains("boom"));
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other}"),
        }
        let logged = std::fs::read_to_string(&log).unwrap();
        assert!(logged.contains("compiling"));
        assert!(logged.contains("boom"));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ToolchainCommand::new("mbedjs-no-such-tool", dir.path());
        let err = run_captured(&cmd).await.unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }
}
