//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string for log spans (e.g. "generate", "modules").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { check: true, .. } => "generate.check",
        Commands::Generate { .. } => "generate",
        Commands::Scan { .. } => "scan",
        Commands::Modules { .. } => "modules",
    }
}
