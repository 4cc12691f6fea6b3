use rsswarden::cli::{output, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Configuration errors end here, before any monitoring starts
    if let Err(e) = Cli::run().await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
