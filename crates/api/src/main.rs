use std::sync::Arc;

use anyhow::Context;

use finops_infra::AppConfig;
use finops_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging comes up before the config so config warnings are visible.
    let log_format = std::env::var("FINOPS_LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse::<LogFormat>().ok())
        .unwrap_or_default();
    finops_observability::init(log_format);

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = finops_api::app::build_services(&config).context("failed to wire services")?;
    let app = finops_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
