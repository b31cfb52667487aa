use actix_web::{web, App, HttpResponse, HttpServer};
use message_auth_service::config::Settings;
use message_auth_service::metrics;
use message_auth_service::security::{MetricsEventSink, TrustPolicyGateway};
use message_auth_service::services::{
    MessageAuthenticationHandler, MessageConsumer, MessageConsumerConfig, SecurityCheckService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rdkafka=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting message authentication service");

    let settings = Settings::load()?;

    let gateway = Arc::new(TrustPolicyGateway::from_settings(&settings.auth)?);
    if settings.auth.verification_key.is_some() {
        tracing::info!(
            algorithm = %settings.auth.verification_algorithm,
            "Strict mode enabled: token signatures will be re-checked"
        );
    }

    let handler = MessageAuthenticationHandler::new(
        gateway,
        Arc::new(MetricsEventSink),
        Arc::new(SecurityCheckService::default()),
    );

    let consumer = MessageConsumer::new(
        MessageConsumerConfig {
            brokers: settings.kafka.brokers.clone(),
            group_id: settings.kafka.group_id.clone(),
            topic: settings.kafka.topic.clone(),
        },
        handler,
    )?;

    tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            tracing::error!("Message consumer terminated: {}", e);
        }
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(&addr)?
    .run()
    .await?;

    Ok(())
}
