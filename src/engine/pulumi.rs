/// Pulumi CLI driver
///
/// Everything past rendering (diffing against recorded state, dependency
/// ordering, provider API calls) happens inside the `pulumi` process. Its
/// diagnostics are passed through unchanged.
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::utils::command::{check_tool_installed, CommandBuilder};

/// Engine operations that change or inspect deployed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Preview,
    Up,
    Destroy,
}

impl Operation {
    fn args(&self) -> &'static [&'static str] {
        match self {
            Operation::Preview => &["preview", "--diff"],
            Operation::Up => &["up", "--yes", "--skip-preview"],
            Operation::Destroy => &["destroy", "--yes", "--skip-preview"],
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.args()[0])
    }
}

/// Runs engine commands against one rendered program
pub struct PulumiEngine {
    program: PathBuf,
    work_dir: PathBuf,
    stack: String,
}

impl PulumiEngine {
    pub fn new(work_dir: PathBuf, stack: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("pulumi"),
            work_dir,
            stack: stack.into(),
        }
    }

    /// Use a different pulumi executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Check if pulumi is installed
    pub async fn check_installed() -> Result<()> {
        check_tool_installed(
            "pulumi",
            &["version"],
            "https://www.pulumi.com/docs/install/",
        )
        .await
    }

    fn command(&self) -> CommandBuilder {
        CommandBuilder::new(&self.program)
            .current_dir(&self.work_dir)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
    }

    /// Select the stack, creating it on first use
    pub async fn select_stack(&self) -> Result<()> {
        self.command()
            .args(["stack", "select", "--create", "--non-interactive"])
            .arg(&self.stack)
            .context("Failed to select pulumi stack")
            .run()
            .await
            .with_context(|| format!("pulumi stack select {} failed", self.stack))?;
        Ok(())
    }

    /// Run an operation with output streamed to the terminal
    pub async fn run(&self, operation: Operation) -> Result<()> {
        info!(
            "Running pulumi {} on stack {} in {}",
            operation,
            self.stack,
            self.work_dir.display()
        );
        self.select_stack().await?;
        self.command()
            .args(operation.args())
            .args(["--stack", self.stack.as_str(), "--non-interactive"])
            .context(format!("pulumi {}", operation))
            .run_inherited()
            .await
    }

    /// Read the stack's exported values
    pub async fn outputs(&self) -> Result<BTreeMap<String, Value>> {
        let stdout = self
            .command()
            .args(["stack", "output", "--json", "--stack", self.stack.as_str()])
            .context("Failed to read stack outputs")
            .run()
            .await?;
        parse_outputs(&stdout)
    }
}

/// Parse `pulumi stack output --json`
pub fn parse_outputs(json: &str) -> Result<BTreeMap<String, Value>> {
    serde_json::from_str(json).context("Failed to parse stack outputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    #[test]
    fn test_operation_args() {
        assert_eq!(Operation::Preview.args(), ["preview", "--diff"]);
        assert!(Operation::Up.args().contains(&"--yes"));
        assert!(Operation::Destroy.args().contains(&"--yes"));
        assert_eq!(Operation::Destroy.to_string(), "destroy");
    }

    #[test]
    fn test_parse_outputs() {
        let outputs = parse_outputs(
            r#"{"url": "https://abc.execute-api.us-east-1.amazonaws.com/stage/", "kubeconfig": "[secret]"}"#,
        )
        .unwrap();

        assert_eq!(
            outputs["url"],
            "https://abc.execute-api.us-east-1.amazonaws.com/stage/"
        );
        assert_eq!(outputs["kubeconfig"], "[secret]");
    }

    #[test]
    fn test_parse_outputs_rejects_garbage() {
        tokio_test::assert_err!(parse_outputs("error: no stack selected"));
        let empty = tokio_test::assert_ok!(parse_outputs("{}"));
        assert!(empty.is_empty());
    }

    /// Executable stand-in for pulumi: logs argv, answers `stack output`, fails `destroy`
    fn fake_pulumi(dir: &Path) -> PathBuf {
        let path = dir.join("pulumi");
        let log = dir.join("argv.log");
        let script = format!(
            r#"#!/bin/sh
echo "$@" >> "{log}"
case "$1 $2" in
  "stack output") echo '{{"url": "https://abc.execute-api.us-east-1.amazonaws.com/stage/"}}' ;;
  destroy*) echo "error: resource still in use" >&2; exit 2 ;;
esac
"#,
            log = log.display()
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn logged_calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("argv.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_up_selects_stack_then_applies() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PulumiEngine::new(dir.path().to_path_buf(), "dev")
            .with_program(fake_pulumi(dir.path()));

        engine.run(Operation::Up).await.unwrap();

        assert_eq!(
            logged_calls(dir.path()),
            [
                "stack select --create --non-interactive dev",
                "up --yes --skip-preview --stack dev --non-interactive",
            ]
        );
    }

    #[tokio::test]
    async fn test_outputs_parsed_from_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PulumiEngine::new(dir.path().to_path_buf(), "prod")
            .with_program(fake_pulumi(dir.path()));

        let outputs = engine.outputs().await.unwrap();

        assert_eq!(
            outputs["url"],
            "https://abc.execute-api.us-east-1.amazonaws.com/stage/"
        );
        assert_eq!(
            logged_calls(dir.path()),
            ["stack output --json --stack prod"]
        );
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PulumiEngine::new(dir.path().to_path_buf(), "dev")
            .with_program(fake_pulumi(dir.path()));

        let err = engine.run(Operation::Destroy).await.unwrap_err();

        assert!(err.to_string().contains("pulumi destroy"));
        assert_eq!(
            logged_calls(dir.path()).last().map(String::as_str),
            Some("destroy --yes --skip-preview --stack dev --non-interactive")
        );
    }

    #[tokio::test]
    async fn test_missing_engine_reported() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PulumiEngine::new(dir.path().to_path_buf(), "dev")
            .with_program(dir.path().join("no-such-pulumi"));

        let err = engine.outputs().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read stack outputs"));
    }
}
