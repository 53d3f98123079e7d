// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generation of runnable macro files for grid jobs.
//!
//! A job runs a copy of a repository macro with seeding and event-count
//! commands appended:
//!
//! ```text
//! <macro contents>
//! /control/getEnv SEED
//! /<app>/randomSeed {SEED}
//! /<app>/beamOn <nevents>
//! exit
//! ```
//!
//! `{SEED}` is expanded by the simulation from the job's environment.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::repository::{WorkingTree, validate_macro_path};

/// Command prefix a simulation application answers to.
pub fn app_alias(app: &str) -> &str {
    match app {
        "BACCARAT" => "Bacc",
        other => other,
    }
}

fn run_commands(app: &str, nevents: u64) -> String {
    let app = app_alias(app);
    format!(
        "\n/control/getEnv SEED\n/{app}/randomSeed {{SEED}}\n/{app}/beamOn {nevents}\nexit\n"
    )
}

/// Builds macro files from the shared working tree.
pub struct MacroGenerator {
    tree: Arc<WorkingTree>,
}

impl MacroGenerator {
    /// Create a generator over `tree`.
    pub fn new(tree: Arc<WorkingTree>) -> Self {
        Self { tree }
    }

    /// Write `macro_path` as of `tag`, plus run commands, to a temp file.
    ///
    /// The file is named `<stem>_<random>.mac` and removed when dropped.
    pub async fn render(
        &self,
        tag: &str,
        macro_path: &str,
        app: &str,
        nevents: u64,
    ) -> Result<NamedTempFile> {
        validate_macro_path(macro_path)?;

        let contents = {
            let tree = self.tree.lock().await;
            tree.fetch().await?;
            tree.checkout(tag).await?;

            let full = tree.root().join(macro_path);
            let is_file = tokio::fs::metadata(&full)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(Error::MacroNotFound {
                    tag: tag.to_string(),
                    path: macro_path.to_string(),
                });
            }
            tokio::fs::read(&full).await?
        };

        let stem = std::path::Path::new(macro_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}_", stem))
            .suffix(".mac")
            .tempfile()?;
        file.write_all(&contents)?;
        file.write_all(run_commands(app, nevents).as_bytes())?;
        file.flush()?;

        info!(
            tag,
            macro_path,
            app,
            nevents,
            file = %file.path().display(),
            "Generated macro file"
        );
        Ok(file)
    }
}
