// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Macro repository backed by a git working tree, driven through the `git`
//! executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::MacroRepository;
use crate::error::{Error, Result};

/// Git clone of the macro repository.
#[derive(Debug, Clone)]
pub struct GitRepository {
    git_dir: PathBuf,
}

impl GitRepository {
    /// Use an existing clone at `git_dir`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    /// Clone `remote` into `git_dir` unless a clone is already there, then
    /// fetch.
    pub async fn open_or_clone(remote: &str, git_dir: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self::new(git_dir);

        let exists = tokio::fs::metadata(&repo.git_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !exists {
            if let Some(parent) = repo.git_dir.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            info!(remote = %remote, git_dir = %repo.git_dir.display(), "Cloning macro repository");
            let mut cmd = Command::new("git");
            cmd.arg("clone")
                .arg("--quiet")
                .arg("--")
                .arg(remote)
                .arg(&repo.git_dir);
            run(cmd, "clone").await?;
        }

        repo.fetch().await?;
        Ok(repo)
    }

    async fn git(&self, command: &'static str, args: &[&str]) -> Result<String> {
        debug!(git_dir = %self.git_dir.display(), command, args = ?args, "Running git");
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.git_dir).arg(command).args(args);
        run(cmd, command).await
    }
}

async fn run(mut cmd: Command, command: &'static str) -> Result<String> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::Git {
            command,
            details: format!("failed to run git: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::Git {
            command,
            details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl MacroRepository for GitRepository {
    fn root(&self) -> &Path {
        &self.git_dir
    }

    async fn fetch(&self) -> Result<()> {
        // `--force` lets tags moved upstream replace the local ones.
        self.git("fetch", &["--tags", "--force", "origin"]).await?;
        Ok(())
    }

    async fn checkout(&self, tag: &str) -> Result<()> {
        // Trailing `--` keeps git from reading the tag as a path.
        self.git("checkout", &["--quiet", "--force", tag, "--"]).await?;
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<String>> {
        let stdout = self.git("tag", &["--list"]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn git_available() -> bool {
        StdCommand::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .arg("-C")
            .arg(dir)
            .args([
                "-c",
                "user.name=Simprod Test",
                "-c",
                "user.email=simprod@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {:?}: {:?}", args, status);
    }

    /// Upstream repository with tags v1.0 (Kr85 only) and v1.1 (Kr85 + Rn222).
    fn upstream(dir: &Path) {
        std::fs::create_dir_all(dir.join("BackgroundMacros")).unwrap();
        git(dir, &["init", "--quiet"]);
        std::fs::write(dir.join("BackgroundMacros/Kr85.mac"), "/run/initialize\n").unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "--quiet", "-m", "Kr85"]);
        git(dir, &["tag", "v1.0"]);
        std::fs::write(dir.join("BackgroundMacros/Rn222.mac"), "/run/initialize\n").unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "--quiet", "-m", "Rn222"]);
        git(dir, &["tag", "v1.1"]);
    }

    #[tokio::test]
    async fn test_clone_list_and_checkout() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        upstream(&origin);

        let clone_dir = temp.path().join("work").join("TDRAnalysis");
        let repo = GitRepository::open_or_clone(&origin.to_string_lossy(), &clone_dir)
            .await
            .unwrap();

        let mut tags = repo.tags().await.unwrap();
        tags.sort();
        assert_eq!(tags, vec!["v1.0", "v1.1"]);

        repo.checkout("v1.0").await.unwrap();
        assert!(clone_dir.join("BackgroundMacros/Kr85.mac").exists());
        assert!(!clone_dir.join("BackgroundMacros/Rn222.mac").exists());

        repo.checkout("v1.1").await.unwrap();
        assert!(clone_dir.join("BackgroundMacros/Rn222.mac").exists());

        // A second open reuses the clone.
        let reopened = GitRepository::open_or_clone(&origin.to_string_lossy(), &clone_dir)
            .await
            .unwrap();
        assert_eq!(reopened.root(), clone_dir.as_path());
    }

    #[tokio::test]
    async fn test_fetch_follows_moved_tag() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        upstream(&origin);
        let clone_dir = temp.path().join("clone");
        let repo = GitRepository::open_or_clone(&origin.to_string_lossy(), &clone_dir)
            .await
            .unwrap();
        repo.checkout("v1.0").await.unwrap();

        std::fs::write(origin.join("BackgroundMacros/Xe127.mac"), "/run/initialize\n").unwrap();
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "--quiet", "-m", "Xe127"]);
        git(&origin, &["tag", "--force", "v1.0"]);

        repo.fetch().await.unwrap();
        repo.checkout("v1.0").await.unwrap();
        assert!(clone_dir.join("BackgroundMacros/Xe127.mac").exists());

        GitRepository::open_or_clone(&origin.to_string_lossy(), &clone_dir)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_git_message() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        upstream(&origin);
        let repo = GitRepository::open_or_clone(&origin.to_string_lossy(), temp.path().join("clone"))
            .await
            .unwrap();
        std::fs::remove_dir_all(&origin).unwrap();

        let err = repo.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Git { command: "fetch", ref details } if !details.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_git_error() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        upstream(&origin);
        let repo = GitRepository::open_or_clone(&origin.to_string_lossy(), temp.path().join("clone"))
            .await
            .unwrap();

        let err = repo.checkout("v9.9").await.unwrap_err();
        assert!(matches!(err, Error::Git { command: "checkout", .. }));
    }
}
