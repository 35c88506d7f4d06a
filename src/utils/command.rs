/// External command execution for the engine CLI
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Result from command execution with captured output
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    /// Return stdout if successful, otherwise error with stderr
    pub fn into_result(self) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            anyhow::bail!("{}", self.stderr.trim())
        }
    }
}

/// Builder for executing external commands
pub struct CommandBuilder {
    command: Command,
    context_msg: Option<String>,
}

impl CommandBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Self {
            command,
            context_msg: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.command.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.command.env(key, val);
        self
    }

    /// Run inside the program directory
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.current_dir(dir);
        self
    }

    /// Set context message for error reporting
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// Execute and return raw output
    pub async fn output(mut self) -> Result<CommandOutput> {
        let output = if let Some(ctx) = &self.context_msg {
            self.command.output().await.context(ctx.clone())?
        } else {
            self.command.output().await?
        };
        Ok(CommandOutput::from_output(output))
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self) -> Result<String> {
        self.output().await?.into_result()
    }

    /// Execute with output streamed to this terminal
    pub async fn run_inherited(mut self) -> Result<()> {
        self.command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let status = match &self.context_msg {
            Some(ctx) => self.command.status().await.context(ctx.clone())?,
            None => self.command.status().await?,
        };
        if !status.success() {
            anyhow::bail!(
                "{} exited with {}",
                self.context_msg.as_deref().unwrap_or("command"),
                status
            );
        }
        Ok(())
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args)
        .output()
        .await;

    match output {
        Ok(out) if out.success => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}
