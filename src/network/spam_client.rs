use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::ClassificationResult;

pub const DEFAULT_SPAM_API_URL: &str = "http://localhost:8001";
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can score message content for spam.
///
/// Implementations never fail: on any problem they answer with
/// [`ClassificationResult::not_spam`].
pub trait SpamClassifier {
    async fn classify(&self, content: &str) -> ClassificationResult;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    spam_level: f64,
}

#[derive(Debug, Error)]
enum ClassifierError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("predictor answered {0}")]
    Status(reqwest::StatusCode),
    #[error("unreadable response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the external `/predict` endpoint.
pub struct HttpSpamClassifier {
    http: Client,
    predict_url: String,
}

impl HttpSpamClassifier {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, CLASSIFY_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    async fn predict(&self, content: &str) -> Result<f64, ClassifierError> {
        let response = self
            .http
            .post(&self.predict_url)
            .json(&PredictRequest { text: content })
            .send()
            .await
            .map_err(ClassifierError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status));
        }

        let body: PredictResponse = response.json().await.map_err(ClassifierError::Decode)?;
        Ok(body.spam_level.clamp(0.0, 1.0))
    }
}

impl SpamClassifier for HttpSpamClassifier {
    async fn classify(&self, content: &str) -> ClassificationResult {
        match self.predict(content).await {
            Ok(score) => {
                log::debug!("Spam level {score:.3} from {}", self.predict_url);
                ClassificationResult::from_score(score)
            }
            Err(err) => {
                log::warn!("Error calling spam detection API at {}: {err}", self.predict_url);
                ClassificationResult::not_spam()
            }
        }
    }
}
