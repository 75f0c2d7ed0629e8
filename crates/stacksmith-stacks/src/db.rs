//! Managed MySQL database with its network and generated credentials.

use serde::{Deserialize, Serialize};
use stacksmith_core::resource::{
    DatabaseEngine, DatabaseInstance, InstanceType, RemovalPolicy, Secret, SubnetType, Vpc,
};
use stacksmith_core::{Result, StackFactory, StackScope};

/// Output holding the database endpoint address.
pub const DB_HOST: &str = "DBHost";
/// Output holding the ARN of the credentials secret.
pub const DB_SECRET_ARN: &str = "DBSecretArn";
/// Output holding the database name.
pub const DB_NAME: &str = "DBName";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbStackConfig {
    pub max_azs: u32,
    pub username: String,
    pub engine_version: String,
    pub instance_class: String,
    pub instance_size: String,
    pub subnet_type: SubnetType,
    pub allocated_storage_gb: u32,
    pub max_allocated_storage_gb: Option<u32>,
    pub database_name: String,
    pub deletion_protection: bool,
    pub removal_policy: RemovalPolicy,
}

impl Default for DbStackConfig {
    // Public subnets and DESTROY on teardown: a demo setup, not for production.
    fn default() -> Self {
        Self {
            max_azs: 2,
            username: "mluser".to_string(),
            engine_version: "8.0.32".to_string(),
            instance_class: "t3".to_string(),
            instance_size: "micro".to_string(),
            subnet_type: SubnetType::Public,
            allocated_storage_gb: 20,
            max_allocated_storage_gb: Some(100),
            database_name: "serverlessml".to_string(),
            deletion_protection: false,
            removal_policy: RemovalPolicy::Destroy,
        }
    }
}

/// VPC, credentials secret and MySQL instance.
///
/// Exposes [`DB_HOST`], [`DB_SECRET_ARN`] and [`DB_NAME`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DbStack;

impl StackFactory for DbStack {
    type Config = DbStackConfig;

    fn declare(&self, scope: &mut StackScope<'_>, config: &DbStackConfig) -> Result<()> {
        scope.set_description("Serverless ML database");

        let vpc = scope.add(
            "ServerlessMLVpc",
            Vpc {
                max_azs: config.max_azs,
            },
        )?;
        let secret = scope.add("DBSecret", Secret::generated_credentials(&config.username))?;
        let instance = scope.add(
            "ServerlessMLRdsInstance",
            DatabaseInstance {
                engine: DatabaseEngine::mysql(&config.engine_version),
                vpc,
                subnet_type: config.subnet_type,
                instance_type: InstanceType::of(&config.instance_class, &config.instance_size),
                allocated_storage_gb: config.allocated_storage_gb,
                max_allocated_storage_gb: config.max_allocated_storage_gb,
                credentials: secret.clone(),
                database_name: config.database_name.clone(),
                deletion_protection: config.deletion_protection,
                removal_policy: config.removal_policy,
            },
        )?;

        let host = scope.attribute(&instance, "Endpoint.Address")?;
        scope.add_described_output(DB_HOST, host, "Database endpoint address")?;
        let arn = scope.attribute(&secret, "Arn")?;
        scope.add_described_output(DB_SECRET_ARN, arn, "Secret holding the database credentials")?;
        scope.add_described_output(DB_NAME, config.database_name.as_str(), "Database name")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacksmith_core::resource::ResourceKind;
    use stacksmith_core::{App, Error, Value};

    #[test]
    fn test_db_stack_resources_and_outputs() {
        let mut app = App::new("serverless-ml");
        let handle = app
            .add_stack(&DbStack, "ServerlessMlDbStack", &DbStackConfig::default())
            .unwrap();
        assert!(handle.get_output(DB_HOST).is_ok());

        let stack = app.stack("ServerlessMlDbStack").unwrap();
        let kinds: Vec<ResourceKind> = stack.resources().iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec![ResourceKind::Vpc, ResourceKind::Secret, ResourceKind::Database]
        );

        let db = stack
            .resource("ServerlessMLRdsInstance")
            .unwrap()
            .as_database()
            .unwrap();
        assert_eq!(db.engine.version, "8.0.32");
        assert_eq!(db.instance_type.to_string(), "t3.micro");
        assert_eq!(db.subnet_type, SubnetType::Public);
        assert!(!db.deletion_protection);

        let secret = stack.resource("DBSecret").unwrap().as_secret().unwrap();
        assert_eq!(secret.username, "mluser");
        assert_eq!(secret.generate_key, "password");
        assert!(secret.exclude_punctuation);

        assert_eq!(
            stack.output_value(DB_NAME).unwrap(),
            &Value::literal("serverlessml")
        );
        assert!(matches!(
            stack.output_value(DB_SECRET_ARN).unwrap(),
            Value::Attribute { resource, attribute, .. }
                if resource == "DBSecret" && attribute == "Arn"
        ));
    }

    #[test]
    fn test_unsupported_engine_version() {
        let mut app = App::new("serverless-ml");
        let config = DbStackConfig {
            engine_version: "5.7.44".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            app.add_stack(&DbStack, "ServerlessMlDbStack", &config),
            Err(Error::Configuration(_))
        ));
        assert!(app.topology().is_empty());
    }

    #[test]
    fn test_max_storage_below_allocated() {
        let mut app = App::new("serverless-ml");
        let config = DbStackConfig {
            allocated_storage_gb: 200,
            ..Default::default()
        };
        assert!(matches!(
            app.add_stack(&DbStack, "ServerlessMlDbStack", &config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_config_overrides_from_json() {
        let config: DbStackConfig =
            serde_json::from_str(r#"{"instance_size": "small", "removal_policy": "retain"}"#)
                .unwrap();
        assert_eq!(config.instance_size, "small");
        assert_eq!(config.removal_policy, RemovalPolicy::Retain);
        assert_eq!(config.database_name, "serverlessml");
    }
}
