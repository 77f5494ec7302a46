//! CLI domain: parse, route, help and output only.
//! No pipeline logic; a single route table dispatches to the orchestrator.

mod help;
mod output;
mod parse;
mod route;

pub use help::command_name;
pub use output::{map_error, FileStatus, GenerateReport, GeneratedFile};
pub use parse::{Cli, Commands, OutputFormat};
pub use route::{CommandOutcome, RunContext, GENERATED_SUFFIX};
