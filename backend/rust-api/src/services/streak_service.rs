use std::sync::Arc;

use chrono::Utc;

use super::relay_service::RelayService;
use super::repository::{QuizRepository, StoreError};
use crate::metrics::FAILURE_STREAK_NOTIFICATIONS_TOTAL;
use crate::models::relay::{FailureStreakNotice, RelayRequest};
use crate::models::{StreakHit, StreakUpdate};

/// Counts wrong answers per (question, user) and escalates to the mentor workflow once.
pub struct StreakService {
    repository: Arc<dyn QuizRepository>,
    relay: RelayService,
    threshold: u32,
}

impl StreakService {
    pub fn new(repository: Arc<dyn QuizRepository>, relay: RelayService, threshold: u32) -> Self {
        Self {
            repository,
            relay,
            threshold,
        }
    }

    pub async fn record_failure(&self, hit: StreakHit) -> Result<StreakUpdate, StoreError> {
        let streak = self
            .repository
            .increment_failure_streak(&hit, Utc::now())
            .await?;

        if !streak.should_notify(self.threshold) {
            return Ok(StreakUpdate::Counted);
        }

        tracing::info!(
            "Question {} reached {} failures (user={:?}), notifying mentor",
            streak.question_id,
            streak.failures,
            streak.user_id
        );

        let request = RelayRequest::NotifyFailureStreak(FailureStreakNotice {
            question_id: streak.question_id.clone(),
            question_text: streak.question_text.clone(),
            justification: streak.justification.clone(),
            failures: streak.failures,
            user_id: streak.user_id.clone(),
        });
        let outcome = self.relay.forward(&request).await;

        if !outcome.is_forwarded() {
            // Left unmarked; the next wrong answer retries the notification.
            tracing::warn!(
                "Mentor notification for question {} not delivered ({})",
                streak.question_id,
                outcome.label()
            );
            FAILURE_STREAK_NOTIFICATIONS_TOTAL
                .with_label_values(&["failed"])
                .inc();
            return Ok(StreakUpdate::NotificationFailed);
        }

        let flipped = self
            .repository
            .mark_streak_notified(&streak.id, Utc::now())
            .await?;
        FAILURE_STREAK_NOTIFICATIONS_TOTAL
            .with_label_values(&["sent"])
            .inc();

        Ok(if flipped {
            StreakUpdate::Notified
        } else {
            StreakUpdate::Counted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::services::memory_repository::InMemoryQuizRepository;

    fn hit() -> StreakHit {
        StreakHit {
            question_id: "q1".to_string(),
            question_text: "¿Qué artículo regula el habeas corpus?".to_string(),
            justification: "Artículo 17.4 CE".to_string(),
            user_id: Some("u1".to_string()),
        }
    }

    fn service(repo: Arc<InMemoryQuizRepository>, url: &str) -> StreakService {
        let relay = RelayService::new(RelayConfig {
            failure_streak_url: format!("{}/streak", url),
            ..RelayConfig::default()
        })
        .unwrap();
        StreakService::new(repo, relay, 3)
    }

    #[tokio::test]
    async fn third_failure_notifies_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/streak")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "action": "notifyFailureStreak",
                "pregunta_id": "q1",
                "fallos": 3
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let repo = Arc::new(InMemoryQuizRepository::new());
        let service = service(repo.clone(), &server.url());

        assert_eq!(service.record_failure(hit()).await.unwrap(), StreakUpdate::Counted);
        assert_eq!(service.record_failure(hit()).await.unwrap(), StreakUpdate::Counted);
        assert_eq!(service.record_failure(hit()).await.unwrap(), StreakUpdate::Notified);
        assert_eq!(service.record_failure(hit()).await.unwrap(), StreakUpdate::Counted);

        mock.assert_async().await;
        let streaks = repo.failure_streaks().await;
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].failures, 4);
        assert!(streaks[0].notified);
    }

    #[tokio::test]
    async fn failed_delivery_leaves_flag_unset() {
        let repo = Arc::new(InMemoryQuizRepository::new());
        let service = service(repo.clone(), "http://127.0.0.1:1");

        for _ in 0..2 {
            service.record_failure(hit()).await.unwrap();
        }
        assert_eq!(
            service.record_failure(hit()).await.unwrap(),
            StreakUpdate::NotificationFailed
        );
        assert!(!repo.failure_streaks().await[0].notified);
    }
}
