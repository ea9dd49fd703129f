use std::process::ExitCode;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = kosma_link::args::parse();
    kosma_link::cli::main(args).await
}
