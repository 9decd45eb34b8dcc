//! PlayKit CLI binary entry point.

use anyhow::Result;
use clap::Parser;
use playkit_cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    app.init_tracing();
    app.run().await
}
