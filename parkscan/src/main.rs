use colored::Colorize;
use parkscan::{build_run_config, command_argument_builder, load_targets_from_source, run_scan};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let mut cmd = command_argument_builder();
    let matches = cmd.get_matches_mut();

    let config = match build_run_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            let _ = cmd.print_help();
            eprintln!("\n{} {}", "error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };

    let url = matches.get_one::<String>("url").map(String::as_str);
    let file = matches.get_one::<String>("file").map(String::as_str);
    let targets = match load_targets_from_source(url, file) {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_scan(&targets, &config).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
