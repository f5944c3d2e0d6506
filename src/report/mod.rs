//! Report emission (§4.9): JSON and HTML renderings of the orchestrator's
//! merged [`crate::pipeline::RunSummary`]. Neither reporter touches the ring
//! buffer or per-thread state directly.

pub mod html;
pub mod json;

use crate::args::Config;
use crate::pipeline::RunSummary;

/// Writes whichever reports `config` requested (`--json`/`--html`), if any.
pub fn emit(config: &Config, summary: &RunSummary) -> std::io::Result<()> {
    if let Some(path) = &config.json {
        json::write(path, config, summary)?;
    }
    if let Some(path) = &config.html {
        html::write(path, config, summary)?;
    }
    Ok(())
}
