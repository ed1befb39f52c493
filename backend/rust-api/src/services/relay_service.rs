use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::RelayConfig;
use crate::metrics::RELAY_REQUESTS_TOTAL;
use crate::models::relay::{RelayAction, RelayOutcome, RelayRequest};

/// Forwards relay requests to the n8n webhooks. Never returns an error: every
/// failure is folded into a [`RelayOutcome`].
#[derive(Clone)]
pub struct RelayService {
    http_client: Client,
    config: RelayConfig,
}

impl RelayService {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder.build().context("Failed to build relay HTTP client")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn target_url(&self, action: RelayAction) -> &str {
        match action {
            RelayAction::Chat => &self.config.chat_url,
            RelayAction::GenerateReviewExercises => &self.config.review_exercises_url,
            RelayAction::NotifyFailureStreak => &self.config.failure_streak_url,
        }
    }

    pub async fn forward(&self, request: &RelayRequest) -> RelayOutcome {
        let action = request.action();
        let url = self.target_url(action);
        let payload = request.outbound_payload();

        tracing::debug!("Forwarding {} to {}", action.as_str(), url);

        let outcome = match self.http_client.post(url).json(&payload).send().await {
            Err(err) => {
                tracing::warn!("Relay {} could not reach {}: {}", action.as_str(), url, err);
                RelayOutcome::ConnectionError {
                    action,
                    error: err.to_string(),
                }
            }
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Err(err) => RelayOutcome::Internal {
                        error: format!("Failed to read n8n response: {}", err),
                    },
                    Ok(body) if !status.is_success() => {
                        tracing::warn!(
                            "Relay {} got status {} from n8n: {}",
                            action.as_str(),
                            status,
                            body
                        );
                        RelayOutcome::Fallback {
                            action,
                            upstream_status: status.as_u16(),
                            upstream_body: body,
                        }
                    }
                    Ok(body) => match serde_json::from_str(&body) {
                        Ok(json) => RelayOutcome::Forwarded(json),
                        Err(err) => {
                            tracing::error!(
                                "Relay {} got a non-JSON success body: {}",
                                action.as_str(),
                                err
                            );
                            RelayOutcome::Internal {
                                error: format!("Invalid JSON from n8n webhook: {}", err),
                            }
                        }
                    },
                }
            }
        };

        RELAY_REQUESTS_TOTAL
            .with_label_values(&[action.as_str(), outcome.label()])
            .inc();

        outcome
    }
}
