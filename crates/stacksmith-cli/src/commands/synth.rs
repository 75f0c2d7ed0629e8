//! Manifest synthesis command.

use anyhow::{Context, Result};
use std::path::Path;

use super::Source;

/// Build the application and write its manifest.
pub fn synth(source: &Source, out: Option<&Path>) -> Result<()> {
    let app = source.load()?;
    let manifest = app.synth().context("Failed to synthesize topology")?;
    let json = manifest.to_json()?;

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
            eprintln!(
                "Wrote manifest {} ({} stacks) to {}",
                manifest.id,
                manifest.stacks.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
