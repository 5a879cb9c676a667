//! CLI commands

use std::fmt::Display;

use kube::config::Kubeconfig;
use tracing::debug;

use crate::{Error, Result};

pub mod contexts;
pub mod format;
pub mod scan;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Load the user's kubeconfig.
///
/// `explicit` is the `--kubeconfig` value (which clap also fills from
/// `KUBECONFIG`). It may list several files separated by the platform path
/// separator; they are merged in order, first definition wins. Without it,
/// kube's default resolution (`KUBECONFIG` / `~/.kube/config`) applies.
pub fn load_kubeconfig(explicit: Option<&str>) -> Result<Kubeconfig> {
    let Some(raw) = explicit.filter(|s| !s.is_empty()) else {
        return Kubeconfig::read()
            .map_err(|e| Error::command_failed(format!("failed to read kubeconfig: {}", e)));
    };

    let mut merged: Option<Kubeconfig> = None;
    for path in std::env::split_paths(raw) {
        debug!(path = %path.display(), "Reading kubeconfig");
        let next = Kubeconfig::read_from(&path).map_err(|e| {
            Error::command_failed(format!("failed to read kubeconfig {}: {}", path.display(), e))
        })?;
        merged = Some(match merged {
            Some(current) => current.merge(next).cmd_err()?,
            None => next,
        });
    }

    merged.ok_or_else(|| Error::validation("--kubeconfig is empty"))
}
