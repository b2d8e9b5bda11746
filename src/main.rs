#[tokio::main]
async fn main() {
    if let Err(error) = dapp_engine::run().await {
        tracing::error!(error = %error, "dapp engine exited with an error");
        eprintln!("dapp-engine: {error}");
        std::process::exit(1);
    }
}
