use forgedesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgedesk_observability::init();

    let config = AppConfig::from_env();
    let engines = forgedesk_api::app::services::build_engines(&config).await?;
    let app = forgedesk_api::app::build_app(engines);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
