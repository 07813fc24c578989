#[path = "commands.rs"]
pub mod commands;

#[path = "handlers.rs"]
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{config_from_matches, handle_discover, init_logging, report_format};
