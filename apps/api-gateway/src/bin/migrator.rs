//! Standalone schema-migration CLI: applies the dataset-metadata schema
//! without starting the HTTP server.

use catalog_infra_db::schema::apply_schema;
use catalog_infra_db::DatabaseClient;
use catalog_shared_telemetry::init_tracing;
use dotenvy::dotenv;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing("catalog_migrator");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        info!("starting schema migration");

        let database_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL undefined in environment");
        let database_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let database_client = match DatabaseClient::connect(&database_url, database_token).await {
            Ok(client) => client,
            Err(error) => {
                error!(error = %error, "failed to establish database link");
                return Err(anyhow::anyhow!(error));
            }
        };

        let connection = database_client
            .get_connection()
            .map_err(|e| anyhow::anyhow!("connection pool exhausted: {e}"))?;

        match apply_schema(&connection).await {
            Ok(()) => {
                info!("schema is current");
                Ok(())
            }
            Err(error) => {
                error!(error = %error, "schema migration failed");
                std::process::exit(1);
            }
        }
    })
}
