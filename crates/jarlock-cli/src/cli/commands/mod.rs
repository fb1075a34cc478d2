//! CLI command handlers. Each command is in its own file.

mod checksum;
mod status;
mod update;
mod verify;

pub use checksum::run_checksum;
pub use status::run_status;
pub use update::run_update;
pub use verify::run_verify;

use anyhow::Result;
use jarlock_core::config::{JarlockConfig, SourceConfig};

/// Resolve `--source` names against the config; empty means all sources.
pub(crate) fn select_sources<'a>(
    cfg: &'a JarlockConfig,
    names: &[String],
) -> Result<Vec<&'a SourceConfig>> {
    if names.is_empty() {
        if cfg.sources.is_empty() {
            anyhow::bail!("no sources configured");
        }
        return Ok(cfg.sources.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            cfg.source(name)
                .ok_or_else(|| anyhow::anyhow!("unknown source {:?}", name))
        })
        .collect()
}
