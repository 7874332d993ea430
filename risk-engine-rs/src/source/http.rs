//! Remote model served over HTTP

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Prediction, ProbabilitySource, SourceError};
use crate::error::ConfigError;
use crate::model::FeatureVector;

const USER_AGENT: &str = concat!("risk-engine-rs/", env!("CARGO_PKG_VERSION"));

/// Body returned by the model endpoint
///
/// Older deployments answer with `risk_score` instead of `probability`.
#[derive(Debug, Deserialize)]
struct ModelResponse {
    probability: Option<f64>,
    risk_score: Option<f64>,
}

/// Probability source backed by a remote model endpoint
///
/// The feature vector is POSTed as JSON. Transport timeouts map to
/// `SourceError::Timeout`, non-2xx statuses to `Unavailable`, and bodies
/// without a usable probability to `InvalidResponse`.
#[derive(Debug, Clone)]
pub struct HttpProbabilitySource {
    client: Client,
    endpoint: Url,
}

impl HttpProbabilitySource {
    /// Create a client for `endpoint`, bounding each request by `timeout`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::invalid(format!("model endpoint '{}': {}", endpoint, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| ConfigError::invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn map_transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(err.to_string())
    } else if err.is_decode() {
        SourceError::InvalidResponse(err.to_string())
    } else {
        SourceError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl ProbabilitySource for HttpProbabilitySource {
    async fn predict(&self, features: &FeatureVector) -> Result<Prediction, SourceError> {
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(features)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "model endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        let parsed: ModelResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::InvalidResponse(format!("malformed body: {}", e)))?;

        let probability = parsed
            .probability
            .or(parsed.risk_score)
            .ok_or_else(|| SourceError::InvalidResponse("response has no probability".to_string()))?;

        let latency = started.elapsed();
        debug!(endpoint = %self.endpoint, probability, ?latency, "model responded");

        Ok(Prediction::new(probability, latency))
    }
}
