//! Kodegen Image Release - build and push container images tagged with the
//! Cargo package version.

use kodegen_image_release::cli;
use kodegen_image_release::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));
            process::exit(e.exit_code());
        }
    }
}
