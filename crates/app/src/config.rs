use anyhow::{bail, Context, Result};
use extrato_storage::DedupMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreSection,
    pub mailbox: MailboxSection,
    pub insights: InsightsSection,
    pub rules: RulesSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    /// Nothing survives the process; useful for dry runs.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: Backend,
    /// Defaults to `extrato.db` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    pub name: String,
    pub transactions_sheet: String,
    pub insights_sheet: String,
    pub dedup: DedupMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            database: None,
            name: "Controle Financeiro".to_string(),
            transactions_sheet: "Transações".to_string(),
            insights_sheet: extrato_insights::INSIGHTS_TABLE.to_string(),
            dedup: DedupMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxSection {
    /// Directory of `.eml` files. Defaults to `inbox/` in the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<PathBuf>,
    pub sender: String,
    pub subject: String,
}

impl Default for MailboxSection {
    fn default() -> Self {
        Self {
            inbox: None,
            sender: "dev.baleeiro@gmail.com".to_string(),
            subject: "Fwd: Extrato da sua conta do Nubank".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsSection {
    /// Run insights after every `sync`, as if `--insights` were passed.
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
}

impl Default for InsightsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: extrato_insights::DEFAULT_BASE_URL.to_string(),
            model: extrato_insights::DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Category rules TOML. The built-in table is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "extrato", "Extrato")
        .context("could not determine home directory")
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

impl Config {
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse config.toml")
    }

    /// Reads `path`, or the default location when `None`. A missing default
    /// file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (p, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path()?, false),
        };
        if !p.exists() {
            if explicit {
                bail!("config not found: {}", p.display());
            }
            tracing::debug!(path = %p.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        Self::parse(&s)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.store.database {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("extrato.db")),
        }
    }

    pub fn inbox_path(&self) -> Result<PathBuf> {
        match &self.mailbox.inbox {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("inbox")),
        }
    }
}

/// Writes a default config to `path` unless one already exists.
/// Returns whether a file was written.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let s = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(true)
}
