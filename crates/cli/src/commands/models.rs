//! Models command handler.
//!
//! Lists the configured model alternatives and the selection policy.

use clap::Args;
use ragline_core::{AppConfig, AppResult};
use ragline_llm::ModelRegistry;

/// List the configured model alternatives
#[derive(Args, Debug)]
pub struct ModelsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModelsCommand {
    /// Execute the models command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let registry = ModelRegistry::from_config(config)?;

        if self.json {
            let output = serde_json::json!({
                "models": registry.names(),
                "default": registry.default_key(),
                "rewrite": config.models.rewrite_key,
                "fallback": config.models.fallback,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Configured models:");
        for name in registry.names() {
            if name == registry.default_key() {
                println!("  {} (default)", name);
            } else {
                println!("  {}", name);
            }
        }

        println!("Rewrite model: {}", config.models.rewrite_key);
        println!("Fallback chain: {}", config.models.fallback.join(", "));

        Ok(())
    }
}
