//! Configuration management
//!
//! Settings live in settings.json inside the data directory:
//! ```json
//! {
//!   "import": {
//!     "defaultTemplate": "nubank",
//!     "autoClassify": true,
//!     "accountTemplates": { "<account uuid>": "itau" }
//!   }
//! }
//! ```
//! Keys the core does not manage are kept untouched on save. A settings
//! file that cannot be parsed is never overwritten.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::templates::{get_template, GENERIC_TEMPLATE_ID};

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_TEMPLATE_ENV: &str = "CAIXA_DEFAULT_TEMPLATE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default)]
    default_template: Option<String>,
    #[serde(default = "default_auto_classify")]
    auto_classify: bool,
    #[serde(default)]
    account_templates: HashMap<String, String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_template: None,
            auto_classify: default_auto_classify(),
            account_templates: HashMap::new(),
            other: HashMap::new(),
        }
    }
}

fn default_auto_classify() -> bool {
    true
}

/// Import configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Stored default template
    pub default_template: Option<String>,
    pub auto_classify: bool,
    /// Template last used per account
    pub account_templates: HashMap<Uuid, String>,
    /// Session-only default from `CAIXA_DEFAULT_TEMPLATE`; never saved
    default_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_template: None,
            auto_classify: default_auto_classify(),
            account_templates: HashMap::new(),
            default_override: None,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// `CAIXA_DEFAULT_TEMPLATE` overrides the stored default template for
    /// this process only. A malformed settings file reads as defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let default_override = std::env::var(DEFAULT_TEMPLATE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::load_with_override(data_dir, default_override)
    }

    fn load_with_override(data_dir: &Path, default_override: Option<String>) -> Result<Self> {
        let raw = match read_settings(data_dir) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "settings unreadable, using defaults");
                SettingsFile::default()
            }
        };

        let account_templates = raw
            .import
            .account_templates
            .iter()
            .filter_map(|(id, template)| Some((Uuid::parse_str(id).ok()?, template.clone())))
            .collect();

        Ok(Self {
            default_template: raw.import.default_template,
            auto_classify: raw.import.auto_classify,
            account_templates,
            default_override,
        })
    }

    /// Save config, preserving settings the core doesn't manage
    ///
    /// Fails without writing when the existing file cannot be parsed.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.import.default_template = self.default_template.clone();
        settings.import.auto_classify = self.auto_classify;
        settings.import.account_templates = self
            .account_templates
            .iter()
            .map(|(id, template)| (id.to_string(), template.clone()))
            .collect();

        let path = data_dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Template to use for an account when none is given explicitly
    ///
    /// Per-account memory first, then the environment override, then the
    /// stored default, then the generic template. Ids that no longer exist
    /// in the registry are ignored.
    pub fn template_for(&self, account_id: Uuid) -> &str {
        self.account_templates
            .get(&account_id)
            .into_iter()
            .chain(self.default_override.as_ref())
            .chain(self.default_template.as_ref())
            .map(String::as_str)
            .find(|id| get_template(id).is_some())
            .unwrap_or(GENERIC_TEMPLATE_ID)
    }

    pub fn remember_template(&mut self, account_id: Uuid, template_id: &str) {
        self.account_templates
            .insert(account_id, template_id.to_string());
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let path = data_dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
