//! Mock tests for the HTTP probability source
//!
//! These use WireMock to stand in for the remote model endpoint.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::EngineConfig;
    use crate::engine::RiskEngine;
    use crate::model::{ArrivalMode, AssessmentSource, FeatureVector, PatientContext, VitalsSnapshot};
    use crate::source::{HttpProbabilitySource, ProbabilitySource, SourceError};

    fn features() -> FeatureVector {
        let vitals = VitalsSnapshot {
            heart_rate: 88.0,
            systolic_bp: 132.0,
            diastolic_bp: 84.0,
            respiratory_rate: 18.0,
            oxygen_saturation: 96.0,
            temperature: 37.2,
        };
        let context = PatientContext {
            acuity_level: 3,
            arrival_mode: ArrivalMode::WalkIn,
        };
        FeatureVector::new(&vitals, &context)
    }

    fn client(server: &MockServer) -> HttpProbabilitySource {
        HttpProbabilitySource::new(&format!("{}/predict", server.uri()), Duration::from_secs(2))
            .expect("Failed to build model client")
    }

    #[tokio::test]
    async fn test_posts_feature_vector_and_reads_probability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_partial_json(json!({
                "heart_rate": 88.0,
                "arrival_mode": "Walk-in",
                "acuity_level": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "probability": 0.37 })))
            .expect(1)
            .mount(&server)
            .await;

        let prediction = client(&server).predict(&features()).await.unwrap();
        assert_eq!(prediction.probability, 0.37);
    }

    #[tokio::test]
    async fn test_accepts_legacy_risk_score_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "risk_score": 0.81, "risk_flag": true })),
            )
            .mount(&server)
            .await;

        let prediction = client(&server).predict(&features()).await.unwrap();
        assert_eq!(prediction.probability, 0.81);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).predict(&features()).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Unavailable("model endpoint returned status 503".to_string())
        );
    }

    #[tokio::test]
    async fn test_bad_bodies_are_invalid_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let err = client(&server).predict(&features()).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;
        let err = client(&server).predict(&features()).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "probability": 0.2 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let source = HttpProbabilitySource::new(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = source.predict(&features()).await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout(_)), "got {:?}", err);
    }

    #[test]
    fn test_rejects_malformed_endpoint() {
        assert!(HttpProbabilitySource::new("::not a url::", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_engine_uses_configured_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "probability": 0.9 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = EngineConfig {
            model_endpoint: Some(format!("{}/predict", server.uri())),
            max_attempts: 1,
            ..EngineConfig::default()
        };
        let engine = RiskEngine::builder().config(config).build().unwrap();

        let vitals = VitalsSnapshot {
            heart_rate: 88.0,
            systolic_bp: 132.0,
            diastolic_bp: 84.0,
            respiratory_rate: 18.0,
            oxygen_saturation: 96.0,
            temperature: 37.2,
        };
        let context = PatientContext {
            acuity_level: 1,
            arrival_mode: ArrivalMode::WalkIn,
        };
        let assessment = engine.assess(&vitals, &context).await.unwrap();

        assert_eq!(assessment.source, AssessmentSource::ModelBased);
        assert_eq!(assessment.risk_score, 90.0);
        assert_eq!(assessment.ml_probability, Some(0.9));
    }
}
