pub mod commands;
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    UsageError, build_run_config, load_targets_from_file, load_targets_from_source, run_scan,
};
