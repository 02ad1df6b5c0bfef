use super::overrides::filter_unset;
use super::{CliOverrides, Settings};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

pub struct VidguardConfig {
    figment: Figment,
}

impl VidguardConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_overrides(None, &CliOverrides::default())
    }

    pub fn load_with_overrides(custom_config: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // A custom config replaces the user and project files
        if let Some(custom_path) = custom_config {
            if !std::path::Path::new(custom_path).exists() {
                anyhow::bail!("Config file not found: {}", custom_path);
            }
            figment = figment.merge(Toml::file(custom_path));
        } else {
            figment = figment
                .merge(Toml::file(Self::user_config_path()))
                .merge(Toml::file("vidguard.toml"));
        }

        figment = figment
            .merge(Env::prefixed("VIDGUARD_").split("__"))
            // Command-line flags that were actually given win over everything
            .merge(Serialized::defaults(filter_unset(overrides)));

        Ok(VidguardConfig { figment })
    }

    /// Extract and validate the typed settings
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/vidguard/config.toml", home),
            Err(_) => "~/.config/vidguard/config.toml".to_string(),
        }
    }
}
