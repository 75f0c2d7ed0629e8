//! Autocomplete API: prediction and training functions sharing one image.

use serde::{Deserialize, Serialize};
use stacksmith_core::resource::{
    Architecture, CorsPolicy, Function, FunctionUrl, HttpMethod, ImageCode,
};
use stacksmith_core::{Result, StackFactory, StackScope};
use std::time::Duration;

pub const PREDICT_URL: &str = "PredictUrl";
pub const TRAIN_URL: &str = "TrainUrl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteApiConfig {
    pub image: String,
    pub architecture: Architecture,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub allowed_origins: Vec<String>,
}

impl Default for AutocompleteApiConfig {
    fn default() -> Self {
        Self {
            image: "./image".to_string(),
            architecture: Architecture::X86_64,
            memory_mb: 1024,
            timeout_secs: 30,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AutocompleteApiStack;

impl AutocompleteApiStack {
    fn endpoint(config: &AutocompleteApiConfig, handler: &str, method: HttpMethod) -> Function {
        let cors = CorsPolicy {
            allowed_methods: vec![method],
            allowed_headers: vec!["*".to_string()],
            allowed_origins: config.allowed_origins.clone(),
        };
        Function::new(ImageCode::from_asset(config.image.as_str()).with_cmd([handler]))
            .with_architecture(config.architecture)
            .with_memory_mb(config.memory_mb)
            .with_timeout(Duration::from_secs(config.timeout_secs.into()))
            .with_url(FunctionUrl::public().with_cors(cors))
    }
}

impl StackFactory for AutocompleteApiStack {
    type Config = AutocompleteApiConfig;

    fn declare(&self, scope: &mut StackScope<'_>, config: &AutocompleteApiConfig) -> Result<()> {
        let predict = scope.add(
            "DockerPredict",
            Self::endpoint(config, "predict.handler", HttpMethod::Post),
        )?;
        let train = scope.add(
            "DockerTrain",
            Self::endpoint(config, "train.handler", HttpMethod::Get),
        )?;

        let url = scope.attribute(&predict, "FunctionUrl")?;
        scope.add_output(PREDICT_URL, url)?;
        let url = scope.attribute(&train, "FunctionUrl")?;
        scope.add_output(TRAIN_URL, url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacksmith_core::{App, Error};

    #[test]
    fn test_autocomplete_functions() {
        let mut app = App::new("ml-autocomplete-api");
        app.add_stack(
            &AutocompleteApiStack,
            "MlAutocompleteApiStack",
            &AutocompleteApiConfig::default(),
        )
        .unwrap();

        let stack = app.stack("MlAutocompleteApiStack").unwrap();
        let predict = stack.resource("DockerPredict").unwrap().as_function().unwrap();
        let train = stack.resource("DockerTrain").unwrap().as_function().unwrap();

        assert_eq!(predict.code.cmd, Some(vec!["predict.handler".to_string()]));
        assert_eq!(train.code.cmd, Some(vec!["train.handler".to_string()]));
        assert_eq!(predict.code.directory, train.code.directory);
        assert_eq!(predict.architecture, Architecture::X86_64);
        assert_eq!(predict.memory_mb, 1024);

        let methods = |f: &Function| f.url.as_ref().unwrap().cors.as_ref().unwrap().allowed_methods.clone();
        assert_eq!(methods(predict), vec![HttpMethod::Post]);
        assert_eq!(methods(train), vec![HttpMethod::Get]);
        assert_eq!(app.public_endpoints().len(), 2);
    }

    #[test]
    fn test_empty_origin_list_is_rejected() {
        let mut app = App::new("ml-autocomplete-api");
        let config = AutocompleteApiConfig {
            allowed_origins: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            app.add_stack(&AutocompleteApiStack, "MlAutocompleteApiStack", &config),
            Err(Error::Configuration(_))
        ));
    }
}
