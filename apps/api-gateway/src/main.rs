//! Gateway binary entry point.

use catalog_api_gateway::config::Settings;
use catalog_api_gateway::prelude::*;
use catalog_shared_telemetry::init_tracing;
use dotenvy::dotenv;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("catalog_api_gateway");

    // Elevated stack size keeps the recursive halve-and-retry batch
    // insert (component E) safe under adversarial input without risking
    // overflow.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        let settings = Settings::from_env();
        let port = settings.listening_port;

        let kernel = ApiGatewayKernel::ignite(settings).await;
        info!(port, "gateway online");
        kernel.launch().await;

        Ok(())
    })
}
