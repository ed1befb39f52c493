use std::sync::Arc;

use crate::config::Config;
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

pub mod memory_repository;
pub mod mongo_repository;
pub mod question_service;
pub mod relay_service;
pub mod repository;
pub mod review_service;
pub mod scoring_service;
pub mod session_service;
pub mod session_store;
pub mod stats_service;
pub mod streak_service;
pub mod taxonomy_seed;
pub mod taxonomy_service;

use mongo_repository::MongoQuizRepository;
use question_service::QuestionService;
use relay_service::RelayService;
use repository::QuizRepository;
use review_service::ReviewService;
use scoring_service::ScoringService;
use session_service::SessionService;
use session_store::{RedisSessionStore, SessionStore};
use stats_service::StatsService;
use streak_service::StreakService;
use taxonomy_service::TaxonomyService;

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn QuizRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub relay: RelayService,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = MongoQuizRepository::new(mongo_client.database(&config.mongo_database));
        mongo.ensure_indexes().await?;

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        let sessions = RedisSessionStore::new(redis, config.session_ttl_seconds);
        Self::with_stores(config, Arc::new(mongo), Arc::new(sessions))
    }

    /// Builds the state over any store implementation (in-memory in tests).
    pub fn with_stores(
        config: Config,
        repository: Arc<dyn QuizRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let relay = RelayService::new(config.relay.clone())?;
        Ok(Self {
            config,
            repository,
            sessions,
            relay,
        })
    }

    pub fn question_service(&self) -> QuestionService {
        QuestionService::new(self.repository.clone())
    }

    pub fn taxonomy_service(&self) -> TaxonomyService {
        TaxonomyService::new(self.repository.clone())
    }

    pub fn stats_service(&self) -> StatsService {
        StatsService::new(self.repository.clone())
    }

    pub fn review_service(&self) -> ReviewService {
        ReviewService::new(
            self.repository.clone(),
            self.relay.clone(),
            self.config.review.clone(),
        )
    }

    pub fn session_service(&self) -> SessionService {
        let streaks = StreakService::new(
            self.repository.clone(),
            self.relay.clone(),
            self.config.failure_threshold,
        );
        SessionService::new(
            self.repository.clone(),
            self.sessions.clone(),
            ScoringService::new(self.repository.clone(), streaks),
        )
    }
}
