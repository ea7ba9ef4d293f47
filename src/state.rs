use deadpool_postgres::Pool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{ConversationResolver, DeliveryCoordinator, PairCache};
use crate::websocket::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool,
    pub registry: ConnectionRegistry,
    pub resolver: Arc<ConversationResolver>,
    pub delivery: DeliveryCoordinator,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Pool,
        cache: Arc<dyn PairCache>,
        registry: ConnectionRegistry,
    ) -> Self {
        let resolver = ConversationResolver::new(
            db.clone(),
            cache,
            config.private_chat_ttl,
            config.cache_write_timeout,
        );
        let delivery =
            DeliveryCoordinator::new(db.clone(), registry.clone(), config.context_timeout);
        Self {
            db,
            registry,
            resolver: Arc::new(resolver),
            delivery,
            config,
        }
    }
}
