use actix_web::{web, App, HttpServer};
use social_chat_service::{
    config, db, error::AppError, logging, metrics,
    middleware::RequestLogging,
    redis_client::RedisClient,
    routes,
    services::RedisPairCache,
    state::AppState,
    websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);
    metrics::register();

    let db = db::init_pool(&cfg.db).await?;

    let redis = RedisClient::from_url(&cfg.redis_url)
        .await
        .map_err(|e| AppError::StartServer(format!("redis: {e}")))?;
    if let Err(e) = redis.ping().await {
        // The cache is a fast path only; resolution still works without it.
        tracing::warn!(error = %e, "redis ping failed at startup");
    }

    let registry = ConnectionRegistry::new();
    let state = AppState::new(
        cfg.clone(),
        db,
        Arc::new(RedisPairCache::new(redis)),
        registry.clone(),
    );

    let bind_addr = cfg.bind_addr();
    tracing::info!(%bind_addr, env = ?cfg.env, "starting social-chat-service");

    let jwt = cfg.jwt.clone();
    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(RequestLogging)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure(jwt.clone()))
    })
    .bind(&bind_addr)
    .map_err(|e| AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| AppError::StartServer(format!("server: {e}")))?;

    registry.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}
