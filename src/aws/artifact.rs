/// Function code archive, built with cargo-lambda when it is missing
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::utils::command::CommandBuilder;

/// Binary target packaged into the archive
pub const RUNTIME_BINARY: &str = "bootstrap";

/// Where cargo-lambda writes the zipped runtime binary, relative to the project
pub fn default_archive_path() -> PathBuf {
    PathBuf::from("target")
        .join("lambda")
        .join(RUNTIME_BINARY)
        .join("bootstrap.zip")
}

/// The archive a function declaration points at
pub struct FunctionArtifact {
    path: PathBuf,
    project_dir: PathBuf,
    cargo: PathBuf,
}

impl FunctionArtifact {
    /// Archive at `path`, buildable from the cargo project in `project_dir`
    pub fn new(path: PathBuf, project_dir: PathBuf) -> Self {
        Self {
            path,
            project_dir,
            cargo: PathBuf::from("cargo"),
        }
    }

    /// Use a different cargo executable
    pub fn with_cargo(mut self, cargo: impl Into<PathBuf>) -> Self {
        self.cargo = cargo.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Make sure the archive exists, building it if needed
    pub async fn ensure(&self) -> Result<()> {
        if self.exists() {
            debug!("Function archive present: {}", self.path.display());
            return Ok(());
        }

        if !self.project_dir.join("Cargo.toml").is_file() {
            anyhow::bail!(
                "Function archive {} not found and {} has no Cargo.toml to build it from. \
                 Build it with `cargo lambda build --release --output-format zip --bin {}` \
                 or point api.artifact at an existing archive",
                self.path.display(),
                self.project_dir.display(),
                RUNTIME_BINARY
            );
        }

        info!(
            "Building function archive {} with cargo-lambda",
            self.path.display()
        );
        CommandBuilder::new(&self.cargo)
            .args([
                "lambda",
                "build",
                "--release",
                "--output-format",
                "zip",
                "--bin",
                RUNTIME_BINARY,
            ])
            .current_dir(&self.project_dir)
            .context("cargo lambda build")
            .run_inherited()
            .await
            .context("Failed to build the function archive. Install cargo-lambda from https://www.cargo-lambda.info")?;

        if !self.exists() {
            anyhow::bail!(
                "cargo lambda finished but {} was not produced",
                self.path.display()
            );
        }
        info!("✓ Function archive built: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Executable stand-in for cargo that records its arguments and drops an archive
    fn fake_cargo(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("fake-cargo");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_existing_archive_is_not_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bootstrap.zip");
        std::fs::write(&archive, b"zip").unwrap();

        FunctionArtifact::new(archive, dir.path().to_path_buf())
            .with_cargo(dir.path().join("no-such-cargo"))
            .ensure()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_archive_without_project_fails_clearly() {
        let dir = tempfile::tempdir().unwrap();
        let err = FunctionArtifact::new(
            dir.path().join(default_archive_path()),
            dir.path().to_path_buf(),
        )
        .ensure()
        .await
        .unwrap_err()
        .to_string();

        assert!(err.contains("not found"));
        assert!(err.contains("cargo lambda build"));
    }

    #[tokio::test]
    async fn test_missing_archive_built_with_cargo_lambda() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        let cargo = fake_cargo(
            dir.path(),
            "echo \"$@\" > args.log\nmkdir -p target/lambda/bootstrap\ntouch target/lambda/bootstrap/bootstrap.zip",
        );

        let artifact = FunctionArtifact::new(
            dir.path().join(default_archive_path()),
            dir.path().to_path_buf(),
        )
        .with_cargo(cargo);
        artifact.ensure().await.unwrap();

        assert!(artifact.exists());
        let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
        assert_eq!(
            args.trim(),
            "lambda build --release --output-format zip --bin bootstrap"
        );
    }

    #[tokio::test]
    async fn test_build_that_produces_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        let cargo = fake_cargo(dir.path(), "exit 0");

        let err = FunctionArtifact::new(
            dir.path().join(default_archive_path()),
            dir.path().to_path_buf(),
        )
        .with_cargo(cargo)
        .ensure()
        .await
        .unwrap_err();

        assert!(err.to_string().contains("was not produced"));
    }
}
