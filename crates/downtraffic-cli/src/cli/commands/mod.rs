//! CLI command handlers. Each command is in its own file.

mod completions;
mod iface;
mod run;
mod sources;

pub use completions::{run_completions, run_man};
pub use iface::run_iface;
pub use run::run_engine;
pub use sources::run_sources;

#[cfg(test)]
pub(crate) use run::resolve_settings;
