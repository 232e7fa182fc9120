//! Round-end automation notification (Ansible AWX / Tower job launch).
//!
//! A blocking POST fired from the hardware thread after `GameOver`.
//! The launch endpoint answers HTTP 201 on success; anything else is
//! retried with exponential backoff up to the configured attempt
//! bound. Failures are logged by the caller and never stop the round
//! cycle.

use crate::config::WebhookConfig;
use crate::error::GameError;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// HTTP client for the job-launch webhook.
pub struct AutomationClient {
    config: WebhookConfig,
    agent: ureq::Agent,
}

impl AutomationClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: WebhookConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self { config, agent }
    }

    /// The JSON body the launch endpoint expects. The score is
    /// truncated to an integer, matching the job template variable.
    pub fn payload(score: f32) -> serde_json::Value {
        json!({
            "extra_vars": {
                "game_score": score as i64,
            }
        })
    }

    /// Delay before each retry attempt (the first attempt is
    /// immediate): `base * 2^n` for retry `n`.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let base = Duration::from_millis(self.config.backoff_base_ms);
        (0..self.config.max_attempts.saturating_sub(1))
            .map(|n| base * 2u32.saturating_pow(n))
            .collect()
    }

    /// POST the final score, retrying on failure.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Api`] after the last attempt fails; the
    /// caller logs it and carries on.
    pub fn notify_score(&self, score: f32) -> Result<(), GameError> {
        let payload = Self::payload(score);
        let retries = self.backoff_schedule();
        let mut last_error = None;

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let delay = retries[attempt as usize - 1];
                warn!(attempt, ?delay, "webhook retry");
                std::thread::sleep(delay);
            }

            match self.post(&payload) {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        // Reached after the last failed attempt, or immediately when
        // max_attempts is zero.
        Err(last_error.unwrap_or_else(|| GameError::Api {
            status: None,
            message: "no attempts made".to_string(),
        }))
    }

    fn post(&self, payload: &serde_json::Value) -> Result<(), GameError> {
        let response = self
            .agent
            .post(&self.config.url)
            .set("Authorization", &format!("Bearer {}", self.config.token))
            .set("Content-Type", "application/json")
            .send_json(payload.clone());

        match response {
            Ok(response) => {
                let status = response.status();
                if status == 201 {
                    info!("automation job launched");
                } else {
                    // Launch endpoints answer 201; any other 2xx is
                    // unexpected but not a failure.
                    warn!(status, "webhook returned unexpected success status");
                }
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => Err(GameError::Api {
                status: Some(status),
                message: "job launch rejected".to_string(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(GameError::Api {
                status: None,
                message: transport.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32, backoff_base_ms: u64) -> WebhookConfig {
        WebhookConfig {
            url: "https://awx.example.com/api/v2/job_templates/1/launch/".to_string(),
            token: "token".to_string(),
            max_attempts,
            backoff_base_ms,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = AutomationClient::payload(17.5);
        assert_eq!(payload["extra_vars"]["game_score"], 17);

        let payload = AutomationClient::payload(0.0);
        assert_eq!(payload["extra_vars"]["game_score"], 0);
    }

    #[test]
    fn test_backoff_doubles_per_retry() {
        let client = AutomationClient::new(config(4, 500));
        assert_eq!(
            client.backoff_schedule(),
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_retries() {
        let client = AutomationClient::new(config(1, 500));
        assert!(client.backoff_schedule().is_empty());
    }

    #[test]
    fn test_zero_attempts_errors_without_posting() {
        // Validation rejects max_attempts == 0, but the client itself
        // must not fabricate a success (or touch the network) for it.
        let client = AutomationClient::new(config(0, 500));
        let err = client.notify_score(1.0).expect_err("no attempts");
        assert!(err.to_string().contains("no attempts made"));
    }
}
