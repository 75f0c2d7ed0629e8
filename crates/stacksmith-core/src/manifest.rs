//! Serialized form of a synthesized topology.
//!
//! The manifest is what gets handed to a deployer: every stack in
//! dependency order, with environment bindings already resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Topology;
use crate::id::RunId;
use crate::stack::Stack;
use crate::{Error, Result};

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Synthesis run that produced this manifest.
    pub id: RunId,
    pub app: String,
    pub created_at: DateTime<Utc>,
    /// Stacks in deployment order.
    pub stacks: Vec<Stack>,
}

impl Manifest {
    pub(crate) fn new(app: &str, stacks: Vec<Stack>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            id: RunId::new(),
            app: app.to_string(),
            created_at: Utc::now(),
            stacks,
        }
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.id() == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest and re-check every stack against its producers.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(Error::Configuration(format!(
                "unsupported manifest version {} (expected {})",
                manifest.version, MANIFEST_VERSION
            )));
        }
        manifest.topology()?;
        Ok(manifest)
    }

    /// Rebuild the topology described by this manifest.
    pub fn topology(&self) -> Result<Topology> {
        Topology::from_stacks(self.stacks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::id::LogicalId;
    use crate::resource::{
        CorsPolicy, Function, FunctionUrl, HttpMethod, ImageCode, Rule, Schedule,
    };
    use crate::stack::{StackScope, stack_fn};
    use std::time::Duration;

    fn sample_app() -> App {
        let mut app = App::new("serverless-ml");
        let db = stack_fn(|scope: &mut StackScope<'_>| {
            scope.add_described_output("DBName", "serverlessml", "Database name")?;
            Ok(())
        });
        app.add_stack(&db, "DbStack", &()).unwrap();

        let api = stack_fn(|scope: &mut StackScope<'_>| {
            let name = scope.import("DbStack", "DBName")?;
            let code = ImageCode::from_asset("./image").with_cmd(["predict.handler"]);
            let predict = Function::new(code)
                .with_memory_mb(1024)
                .with_timeout(Duration::from_secs(30))
                .with_env("DB_NAME", name)
                .with_url(FunctionUrl::public().with_cors(CorsPolicy {
                    allowed_methods: vec![HttpMethod::Post],
                    allowed_headers: vec!["*".to_string()],
                    allowed_origins: vec!["*".to_string()],
                }));
            scope.add("DockerPredict", predict)?;
            let drift = scope.add("DriftFn", Function::new(ImageCode::from_asset("../drift")))?;
            scope.add("DriftRule", Rule::new(Schedule::days(7)?).with_target(drift))?;
            let url = scope.attribute(&LogicalId::new("DockerPredict")?, "FunctionUrl")?;
            scope.add_output("PredictUrl", url)?;
            Ok(())
        });
        app.add_stack(&api, "ApiStack", &()).unwrap();
        app
    }

    #[test]
    fn test_manifest_round_trip_keeps_resources_and_outputs() {
        let manifest = sample_app().synth().unwrap();
        let json = manifest.to_json().unwrap();
        let parsed = Manifest::from_json(&json).unwrap();

        assert_eq!(parsed, manifest);
        let api = parsed.stack("ApiStack").unwrap();
        assert_eq!(api.resources(), manifest.stack("ApiStack").unwrap().resources());
        assert_eq!(api.outputs(), manifest.stack("ApiStack").unwrap().outputs());
        assert_eq!(
            parsed.stack("DbStack").unwrap().outputs()[0].description.as_deref(),
            Some("Database name")
        );
    }

    #[test]
    fn test_manifest_lists_producers_first() {
        let manifest = sample_app().synth().unwrap();
        let ids: Vec<&str> = manifest.stacks.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["DbStack", "ApiStack"]);
    }

    #[test]
    fn test_manifest_rejects_dangling_dependency() {
        let mut manifest = sample_app().synth().unwrap();
        manifest.stacks.remove(0);
        let json = manifest.to_json().unwrap();
        assert!(Manifest::from_json(&json).is_err());
    }

    #[test]
    fn test_manifest_rejects_unknown_version() {
        let mut manifest = sample_app().synth().unwrap();
        manifest.version = 99;
        let json = manifest.to_json().unwrap();
        assert!(matches!(
            Manifest::from_json(&json),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_manifest_rejects_invalid_resource() {
        let manifest = sample_app().synth().unwrap();
        let json = manifest
            .to_json()
            .unwrap()
            .replace("\"memory_mb\": 1024", "\"memory_mb\": 0");
        assert!(matches!(
            Manifest::from_json(&json),
            Err(Error::Configuration(_))
        ));
    }
}
