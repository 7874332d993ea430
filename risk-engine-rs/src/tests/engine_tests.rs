//! End-to-end tests for `RiskEngine`
//!
//! The probability source is replaced by mocks so each dependency failure
//! mode can be forced. Whatever the source does, a valid input must always
//! produce an assessment.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::{sleep, Instant};

    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::engine::{ModelStatus, RiskEngine};
    use crate::model::{
        ArrivalMode, AssessmentSource, FeatureVector, PatientContext, RiskCategory, TriageCategory,
        VitalsSnapshot,
    };
    use crate::resilience::{BreakerHealth, BreakerSettings, CircuitBreakerRegistry};
    use crate::source::{
        HeuristicProbabilitySource, MockProbabilitySource, Prediction, ProbabilitySource,
        SourceError,
    };

    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl ProbabilitySource for SlowSource {
        async fn predict(&self, _features: &FeatureVector) -> Result<Prediction, SourceError> {
            sleep(self.delay).await;
            Ok(Prediction::new(0.5, self.delay))
        }
    }

    fn deteriorating_vitals() -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: 130.0,
            systolic_bp: 85.0,
            diastolic_bp: 60.0,
            respiratory_rate: 26.0,
            oxygen_saturation: 86.0,
            temperature: 37.0,
        }
    }

    fn ambulance_acuity_four() -> PatientContext {
        PatientContext {
            acuity_level: 4,
            arrival_mode: ArrivalMode::Ambulance,
        }
    }

    fn single_attempt_config() -> EngineConfig {
        EngineConfig {
            max_attempts: 1,
            ..EngineConfig::default()
        }
    }

    fn mock_returning(result: Result<f64, SourceError>, times: usize) -> MockProbabilitySource {
        let mut mock = MockProbabilitySource::new();
        mock.expect_predict().times(times).returning(move |_| {
            result
                .clone()
                .map(|probability| Prediction::new(probability, Duration::from_millis(4)))
        });
        mock
    }

    fn engine_with(source: MockProbabilitySource) -> RiskEngine {
        RiskEngine::builder()
            .config(single_attempt_config())
            .source(source)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_deteriorating_patient_scores_critical() {
        let engine = engine_with(mock_returning(Ok(0.6), 1));

        let assessment = engine
            .assess(&deteriorating_vitals(), &ambulance_acuity_four())
            .await
            .unwrap();

        assert_eq!(assessment.source, AssessmentSource::ModelBased);
        assert!((assessment.ml_score.unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(assessment.clinical_adjustment, Some(75.0));
        assert_eq!(assessment.risk_score, 100.0);
        assert_eq!(assessment.risk_category, RiskCategory::Critical);
        assert_eq!(assessment.final_triage_category, TriageCategory::High);
        assert!(assessment.risk_flag);
        assert_eq!(assessment.ml_probability, Some(0.6));
        assert!(assessment.error_message.is_none());
        assert_eq!(assessment.contributing_factors.len(), 6);
        assert_eq!(assessment.warnings.len(), 2);
        assert_eq!(assessment.model_version.as_deref(), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_model() {
        let engine = engine_with(mock_returning(Ok(0.2), 0));
        let vitals = VitalsSnapshot {
            systolic_bp: 80.0,
            diastolic_bp: 95.0,
            ..deteriorating_vitals()
        };

        let err = engine.assess(&vitals, &ambulance_acuity_four()).await.unwrap_err();
        assert_eq!(err.field(), "bp_relationship");

        let context = PatientContext {
            acuity_level: 9,
            arrival_mode: ArrivalMode::WalkIn,
        };
        let err = engine.assess(&deteriorating_vitals(), &context).await.unwrap_err();
        assert_eq!(err.field(), "acuity_level");
    }

    #[tokio::test]
    async fn test_every_source_failure_degrades_to_fallback() {
        let failures = vec![
            (Err(SourceError::Unavailable("status 503".into())), "unexpected"),
            (Err(SourceError::InvalidResponse("no probability".into())), "invalid response"),
            (Err(SourceError::Timeout("read timed out".into())), "timed out"),
            (Ok(1.7), "outside [0, 1]"),
            (Ok(f64::NAN), "outside [0, 1]"),
        ];

        for (result, expected_message) in failures {
            let engine = engine_with(mock_returning(result, 1));
            let assessment = engine
                .assess(&deteriorating_vitals(), &ambulance_acuity_four())
                .await
                .unwrap();

            assert_eq!(assessment.source, AssessmentSource::Fallback);
            assert!(assessment.is_degraded());
            let message = assessment.error_message.clone().unwrap_or_default();
            assert!(
                message.contains(expected_message),
                "'{}' should mention '{}'",
                message,
                expected_message
            );
            // 60 acuity base + 60 from rules, clamped
            assert_eq!(assessment.risk_score, 100.0);
            assert!(assessment.risk_flag);
            assert_eq!(assessment.risk_category, RiskCategory::High);
            assert_eq!(assessment.final_triage_category, TriageCategory::High);
            assert!(assessment.ml_probability.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_times_out_into_fallback() {
        let engine = RiskEngine::builder()
            .config(single_attempt_config())
            .source(SlowSource {
                delay: Duration::from_secs(60),
            })
            .build()
            .unwrap();

        let assessment = engine
            .assess(&deteriorating_vitals(), &ambulance_acuity_four())
            .await
            .unwrap();

        assert_eq!(assessment.source, AssessmentSource::Fallback);
        assert!(assessment.error_message.unwrap_or_default().contains("timed out"));
        assert_eq!(engine.breakers().failure_count(engine.dependency_key()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_aborts_model_call() {
        let config = EngineConfig {
            max_attempts: 3,
            ..EngineConfig::default()
        };
        let engine = RiskEngine::builder()
            .config(config)
            .source(SlowSource {
                delay: Duration::from_secs(3),
            })
            .build()
            .unwrap();

        let started = Instant::now();
        let deadline = started + Duration::from_millis(200);
        let assessment = engine
            .assess_with_deadline(&deteriorating_vitals(), &ambulance_acuity_four(), deadline)
            .await
            .unwrap();

        assert_eq!(assessment.source, AssessmentSource::Fallback);
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(engine.breakers().failure_count(engine.dependency_key()), 1);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_model_and_reports_health() {
        let clock = Arc::new(ManualClock::new());
        let engine = RiskEngine::builder()
            .config(single_attempt_config())
            .source(mock_returning(Err(SourceError::Unavailable("connection refused".into())), 5))
            .clock(clock.clone())
            .build()
            .unwrap();

        for _ in 0..5 {
            let assessment = engine
                .assess(&deteriorating_vitals(), &ambulance_acuity_four())
                .await
                .unwrap();
            assert!(assessment.is_degraded());
        }

        let assessment = engine
            .assess(&deteriorating_vitals(), &ambulance_acuity_four())
            .await
            .unwrap();
        assert!(assessment
            .error_message
            .unwrap_or_default()
            .contains("circuit breaker open"));

        match engine.health() {
            BreakerHealth::Open { failure_count, .. } => assert_eq!(failure_count, 5),
            BreakerHealth::Closed => panic!("breaker should be open"),
        }
        let stats = engine.breaker_statistics();
        assert!(stats.open_breakers.contains_key("patient_risk_model"));

        clock.advance(Duration::from_secs(300));
        assert_eq!(engine.health(), BreakerHealth::Closed);
    }

    #[tokio::test]
    async fn test_engines_can_share_a_registry() {
        let registry = Arc::new(CircuitBreakerRegistry::new(BreakerSettings {
            failure_threshold: 2,
            cooldown: Duration::from_secs(300),
        }));
        let failing = RiskEngine::builder()
            .config(single_attempt_config())
            .source(mock_returning(Err(SourceError::Unavailable("down".into())), 2))
            .breakers(Arc::clone(&registry))
            .build()
            .unwrap();
        let healthy = RiskEngine::builder()
            .config(single_attempt_config())
            .source(mock_returning(Ok(0.3), 0))
            .breakers(Arc::clone(&registry))
            .build()
            .unwrap();

        for _ in 0..2 {
            let _ = failing
                .assess(&deteriorating_vitals(), &ambulance_acuity_four())
                .await
                .unwrap();
        }

        let assessment = healthy
            .assess(&deteriorating_vitals(), &ambulance_acuity_four())
            .await
            .unwrap();
        assert!(assessment.is_degraded());
        assert!(healthy.health_of("patient_risk_model").is_open());
    }

    #[tokio::test]
    async fn test_model_health_probe() {
        let engine = RiskEngine::builder()
            .config(single_attempt_config())
            .source(HeuristicProbabilitySource::new())
            .build()
            .unwrap();
        let report = engine.check_model_health().await;
        assert_eq!(report.status, ModelStatus::Healthy);
        assert!(report.probability.is_some());
        assert_eq!(report.breaker, BreakerHealth::Closed);

        let engine = engine_with(mock_returning(Err(SourceError::Unavailable("down".into())), 1));
        let report = engine.check_model_health().await;
        assert!(!report.is_healthy());
        assert!(report.error.unwrap_or_default().contains("down"));
        assert_eq!(engine.breakers().failure_count(engine.dependency_key()), 0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = EngineConfig {
            max_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(RiskEngine::builder().config(config).build().is_err());

        let config = EngineConfig {
            model_endpoint: Some("not a url".into()),
            ..EngineConfig::default()
        };
        assert!(RiskEngine::builder().config(config).build().is_err());
    }
}
