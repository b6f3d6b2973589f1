use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use nf_match_rust::{api, AppConfig, BatchProcessor};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs com hora local
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // Configuração
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // Serviço de conciliação (um processador compartilhado, lotes independentes)
    let processor = Arc::new(BatchProcessor::from_config(&config));

    // Rotas
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/conciliar", post(api::conciliar))
        .route("/api/conciliar/relatorio", post(api::conciliar_relatorio))
        .with_state(processor)
        .layer(DefaultBodyLimit::max(
            config.server.max_upload_mb * 1024 * 1024,
        ))
        .layer(ServiceBuilder::new());

    // Inicia o servidor
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/conciliar            - upload de PDFs, retorna o ZIP conciliado");
    info!("  POST /api/conciliar/relatorio  - mesmo processamento, só o relatório JSON");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
