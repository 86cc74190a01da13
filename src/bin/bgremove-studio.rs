//! Background Removal Studio CLI
//!
//! Command-line frontend that queues images, sends them to a remote background
//! removal service and exports the results.

#[cfg(feature = "cli")]
use bgremove_studio::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
