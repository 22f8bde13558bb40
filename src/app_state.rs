use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    auth::AuthKeys, orchestrator::ScrapeOrchestrator, queue::RedisJobQueue,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<RedisJobQueue>,
    pub orchestrator: Arc<ScrapeOrchestrator>,
    pub auth: Arc<AuthKeys>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        queue: Arc<RedisJobQueue>,
        orchestrator: ScrapeOrchestrator,
        auth: AuthKeys,
    ) -> Self {
        Self {
            db,
            queue,
            orchestrator: Arc::new(orchestrator),
            auth: Arc::new(auth),
        }
    }
}
