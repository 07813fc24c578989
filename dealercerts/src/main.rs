use dealercerts::commands::command_argument_builder;
use dealercerts::handlers::{handle_discover, init_logging, print_banner};

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    let quiet = matches.get_flag("quiet");

    init_logging(quiet);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if let Err(e) = handle_discover(&matches).await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
