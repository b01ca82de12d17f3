//! Binary entrypoint for the `pooldeck` CLI.

#[tokio::main]
async fn main() {
    let exit_code = pooldeck_cli::run().await;
    std::process::exit(exit_code);
}
