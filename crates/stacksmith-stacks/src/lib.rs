//! Serverless ML stacks built with Stacksmith.
//!
//! - [`DbStack`]: VPC, generated credentials and a MySQL instance
//! - [`ApiStack`]: prediction function with a public URL, drift function on a
//!   weekly schedule
//! - [`AutocompleteApiStack`]: prediction and training functions with CORS

pub mod api;
pub mod autocomplete;
pub mod db;

pub use api::{ApiStack, ApiStackConfig, DatabaseBinding};
pub use autocomplete::{AutocompleteApiConfig, AutocompleteApiStack};
pub use db::{DbStack, DbStackConfig};

use stacksmith_core::{App, Result};
use tracing::debug;

pub const DB_STACK_ID: &str = "ServerlessMlDbStack";
pub const API_STACK_ID: &str = "ServerlessMlApiStack";
pub const AUTOCOMPLETE_STACK_ID: &str = "MlAutocompleteApiStack";

/// The serverless ML application: database stack, then API stack.
///
/// The API stack is not bound to the database; set
/// [`ApiStackConfig::database`] to wire them.
pub fn serverless_ml_app() -> Result<App> {
    let mut app = App::new("serverless-ml");
    app.add_stack(&DbStack, DB_STACK_ID, &DbStackConfig::default())?;
    app.add_stack(&ApiStack, API_STACK_ID, &ApiStackConfig::default())?;
    debug!(stacks = app.topology().len(), "Built serverless ML app");
    Ok(app)
}

/// The autocomplete API application.
pub fn autocomplete_app() -> Result<App> {
    let mut app = App::new("ml-autocomplete-api");
    app.add_stack(
        &AutocompleteApiStack,
        AUTOCOMPLETE_STACK_ID,
        &AutocompleteApiConfig::default(),
    )?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacksmith_core::Manifest;

    #[test]
    fn test_serverless_ml_app_synth() {
        let app = serverless_ml_app().unwrap();
        let manifest = app.synth().unwrap();
        let ids: Vec<&str> = manifest.stacks.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec![DB_STACK_ID, API_STACK_ID]);

        // The stacks are independent
        assert!(manifest.stack(API_STACK_ID).unwrap().dependencies().is_empty());

        let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_autocomplete_app_synth() {
        let manifest = autocomplete_app().unwrap().synth().unwrap();
        assert_eq!(manifest.app, "ml-autocomplete-api");
        assert_eq!(manifest.stacks.len(), 1);
    }
}
