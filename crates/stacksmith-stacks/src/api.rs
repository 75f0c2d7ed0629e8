//! Prediction endpoint and weekly drift detection.

use serde::{Deserialize, Serialize};
use stacksmith_core::resource::{Architecture, Function, FunctionUrl, ImageCode, Rule, Schedule};
use stacksmith_core::{Result, StackFactory, StackScope};
use std::time::Duration;

use crate::db::{DB_HOST, DB_NAME, DB_SECRET_ARN};

/// Output holding the public URL of the prediction function.
pub const PREDICT_URL: &str = "PredictFnUrl";

/// Database outputs to expose to the prediction function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseBinding {
    /// Id of a stack built with [`crate::DbStack`].
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiStackConfig {
    pub predict_image: String,
    pub drift_image: String,
    pub architecture: Architecture,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub model_bucket: String,
    pub champion_ssm_param: String,
    pub feature_table: String,
    pub ks_results_table: String,
    pub drift_schedule: Schedule,
    pub database: Option<DatabaseBinding>,
}

impl Default for ApiStackConfig {
    fn default() -> Self {
        Self {
            predict_image: "../../lambda/predict".to_string(),
            drift_image: "../../lambda/drift".to_string(),
            architecture: Architecture::Arm64,
            memory_mb: 512,
            timeout_secs: 30,
            model_bucket: "ml-demo-models".to_string(),
            champion_ssm_param: "/serverless-ml/champion-model".to_string(),
            feature_table: "mental_health_features".to_string(),
            ks_results_table: "ks_test_results".to_string(),
            drift_schedule: Schedule::Rate {
                minutes: 7 * 24 * 60,
            },
            database: None,
        }
    }
}

/// `PredictFn` behind a public URL, and `DriftFn` fired by
/// `DriftDetectionRule`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiStack;

impl ApiStack {
    fn function(config: &ApiStackConfig, directory: &str) -> Function {
        Function::new(ImageCode::from_asset(directory))
            .with_architecture(config.architecture)
            .with_memory_mb(config.memory_mb)
            .with_timeout(Duration::from_secs(config.timeout_secs.into()))
    }
}

impl StackFactory for ApiStack {
    type Config = ApiStackConfig;

    fn declare(&self, scope: &mut StackScope<'_>, config: &ApiStackConfig) -> Result<()> {
        scope.set_description("Serverless ML prediction API and drift detection");

        let mut predict = Self::function(config, &config.predict_image)
            .with_env("MODEL_BUCKET", config.model_bucket.as_str())
            .with_env("CHAMPION_SSM_PARAM", config.champion_ssm_param.as_str())
            .with_env("FEATURE_TABLE", config.feature_table.as_str())
            .with_url(FunctionUrl::public());
        if let Some(binding) = &config.database {
            predict = predict
                .with_env("DB_HOST", scope.import(&binding.stack, DB_HOST)?)
                .with_env("DB_NAME", scope.import(&binding.stack, DB_NAME)?)
                .with_env("DB_SECRET_ARN", scope.import(&binding.stack, DB_SECRET_ARN)?);
        }
        let predict = scope.add("PredictFn", predict)?;

        let drift = Self::function(config, &config.drift_image)
            .with_env("FEATURE_TABLE", config.feature_table.as_str())
            .with_env("KS_RESULTS_TABLE", config.ks_results_table.as_str());
        let drift = scope.add("DriftFn", drift)?;

        scope.add(
            "DriftDetectionRule",
            Rule::new(config.drift_schedule.clone()).with_target(drift),
        )?;

        let url = scope.attribute(&predict, "FunctionUrl")?;
        scope.add_described_output(PREDICT_URL, url, "Public prediction endpoint")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DbStack, DbStackConfig};
    use stacksmith_core::{App, Error, Value};

    #[test]
    fn test_api_stack_without_database() {
        let mut app = App::new("serverless-ml");
        app.add_stack(&ApiStack, "ServerlessMlApiStack", &ApiStackConfig::default())
            .unwrap();

        let stack = app.stack("ServerlessMlApiStack").unwrap();
        assert!(stack.dependencies().is_empty());

        let predict = stack.resource("PredictFn").unwrap().as_function().unwrap();
        assert_eq!(predict.architecture, Architecture::Arm64);
        assert_eq!(predict.memory_mb, 512);
        assert_eq!(predict.timeout_secs, 30);
        assert_eq!(predict.environment.len(), 3);
        assert_eq!(
            predict.environment["MODEL_BUCKET"],
            Value::literal("ml-demo-models")
        );
        assert!(predict.is_public());

        let drift = stack.resource("DriftFn").unwrap().as_function().unwrap();
        assert!(drift.url.is_none());
        assert_eq!(
            drift.environment["KS_RESULTS_TABLE"],
            Value::literal("ks_test_results")
        );

        let rule = stack.resource("DriftDetectionRule").unwrap().as_rule().unwrap();
        assert_eq!(rule.schedule.expression(), "rate(7 days)");
        assert_eq!(
            rule.schedule
                .firings_within(Duration::from_secs(7 * 24 * 3600)),
            Some(1)
        );
        assert_eq!(rule.targets, vec!["DriftFn"]);
    }

    #[test]
    fn test_database_binding_resolves_outputs() {
        let mut app = App::new("serverless-ml");
        app.add_stack(&DbStack, "ServerlessMlDbStack", &DbStackConfig::default())
            .unwrap();
        let config = ApiStackConfig {
            database: Some(DatabaseBinding {
                stack: "ServerlessMlDbStack".to_string(),
            }),
            ..Default::default()
        };
        app.add_stack(&ApiStack, "ServerlessMlApiStack", &config).unwrap();

        let db = app.stack("ServerlessMlDbStack").unwrap();
        let api = app.stack("ServerlessMlApiStack").unwrap();
        let env = &api.resource("PredictFn").unwrap().as_function().unwrap().environment;
        assert_eq!(&env["DB_HOST"], db.output_value(DB_HOST).unwrap());
        assert_eq!(env["DB_NAME"], Value::literal("serverlessml"));
        assert_eq!(&env["DB_SECRET_ARN"], db.output_value(DB_SECRET_ARN).unwrap());
        assert!(api.dependencies().contains("ServerlessMlDbStack"));
    }

    #[test]
    fn test_database_binding_before_db_stack() {
        let mut app = App::new("serverless-ml");
        let config = ApiStackConfig {
            database: Some(DatabaseBinding {
                stack: "ServerlessMlDbStack".to_string(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            app.add_stack(&ApiStack, "ServerlessMlApiStack", &config),
            Err(Error::DependencyOrder { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut app = App::new("serverless-ml");
        let config = ApiStackConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            app.add_stack(&ApiStack, "ServerlessMlApiStack", &config),
            Err(Error::Configuration(_))
        ));
    }
}
