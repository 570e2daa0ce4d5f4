use anyhow::{Context, Result};
use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, sync::Arc, time::Duration};
use tokio::sync::broadcast;

use crate::{autosave::SaveOptions, persistence::DEFAULT_STORAGE_KEY, session::SessionOptions};

/// Config is merged: system -> user -> workspace -> runtime (ephemeral).
/// Every field is optional so a layer only overrides what it sets.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub autosave: AutosaveConfig,
    pub list: ListConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: Option<PathBuf>,   // defaults to the platform data dir
    pub key: Option<String>,    // defaults to "shopping_list"
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AutosaveConfig {
    pub debounce_ms: Option<u64>,
    pub retry_once: Option<bool>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ListConfig {
    pub seed_defaults: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: Option<String>, // tracing EnvFilter directive, e.g. "shoplist=debug"
}

impl Config {
    pub fn storage_key(&self) -> String {
        self.storage.key.clone().unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string())
    }

    pub fn data_dir(&self, workspace_root: &Path) -> PathBuf {
        if let Some(dir) = &self.storage.dir { return dir.clone(); }
        ProjectDirs::from("org", "shoplist", "shoplist")
            .map(|p| p.data_dir().to_path_buf())
            .unwrap_or_else(|| workspace_root.join(".shoplist").join("data"))
    }

    pub fn save_options(&self) -> SaveOptions {
        let d = SaveOptions::default();
        SaveOptions {
            debounce: self.autosave.debounce_ms.map(Duration::from_millis).unwrap_or(d.debounce),
            retry_once: self.autosave.retry_once.unwrap_or(d.retry_once),
            retry_delay: self.autosave.retry_delay_ms.map(Duration::from_millis).unwrap_or(d.retry_delay),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions { seed_defaults: self.list.seed_defaults.unwrap_or(true), save: self.save_options() }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope { System, User, Workspace, Runtime }

fn merge(a: &mut Config, b: &Config) {
    fn overlay<T: Clone>(dst: &mut Option<T>, src: &Option<T>) { if src.is_some() { *dst = src.clone(); } }
    overlay(&mut a.storage.dir, &b.storage.dir);
    overlay(&mut a.storage.key, &b.storage.key);

    overlay(&mut a.autosave.debounce_ms, &b.autosave.debounce_ms);
    overlay(&mut a.autosave.retry_once, &b.autosave.retry_once);
    overlay(&mut a.autosave.retry_delay_ms, &b.autosave.retry_delay_ms);

    overlay(&mut a.list.seed_defaults, &b.list.seed_defaults);

    overlay(&mut a.logging.filter, &b.logging.filter);
}

fn config_paths(workspace_root: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let system = if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\ProgramData\shoplist\config.toml")
    } else {
        PathBuf::from("/etc/shoplist/config.toml")
    };
    let workspace = workspace_root.join(".shoplist").join("config.toml");
    let user = ProjectDirs::from("org", "shoplist", "shoplist")
        .map(|p| p.config_dir().join("config.toml"))
        // no home directory: fold the user layer into the workspace directory
        .unwrap_or_else(|| workspace_root.join(".shoplist").join("user.toml"));
    (system, user, workspace)
}

#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<RwLock<Config>>,
    tx: broadcast::Sender<Config>,
    system_path: PathBuf,
    user_path: PathBuf,
    workspace_path: PathBuf,
    runtime_overlay: Arc<RwLock<Config>>,
}

impl ConfigManager {
    pub fn load(workspace_root: impl AsRef<Path>) -> Result<Self> {
        let (system, user, workspace) = config_paths(workspace_root.as_ref());
        Self::from_paths(system, user, workspace)
    }

    pub fn from_paths(system_path: PathBuf, user_path: PathBuf, workspace_path: PathBuf) -> Result<Self> {
        let cm = Self {
            inner: Arc::new(RwLock::new(Config::default())),
            tx: broadcast::channel(16).0,
            system_path, user_path, workspace_path,
            runtime_overlay: Arc::new(RwLock::new(Config::default())),
        };
        cm.reload_all()?;
        Ok(cm)
    }

    /// Missing files are empty layers; a file that exists but does not parse is an error.
    fn read_file(path: &Path) -> Result<Option<Config>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let c: Config = toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(c))
    }

    pub fn reload_all(&self) -> Result<()> {
        let mut merged = Config::default();
        for path in [&self.system_path, &self.user_path, &self.workspace_path] {
            if let Some(layer) = Self::read_file(path)? { merge(&mut merged, &layer); }
        }
        let rt = self.runtime_overlay.read().clone();
        merge(&mut merged, &rt);
        *self.inner.write() = merged.clone();
        let _ = self.tx.send(merged);
        Ok(())
    }

    pub fn get(&self) -> Config { self.inner.read().clone() }
    pub fn subscribe(&self) -> broadcast::Receiver<Config> { self.tx.subscribe() }

    pub fn path(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::System => Some(&self.system_path),
            Scope::User => Some(&self.user_path),
            Scope::Workspace => Some(&self.workspace_path),
            Scope::Runtime => None,
        }
    }

    pub fn apply_runtime_overlay(&self, patch: Config) -> Result<()> {
        {
            let mut rt = self.runtime_overlay.write();
            merge(&mut *rt, &patch);
        }
        self.reload_all()
    }

    pub fn write_patch(&self, scope: Scope, patch: &Config) -> Result<()> {
        let Some(path) = self.path(scope) else {
            anyhow::bail!("Runtime scope is ephemeral; cannot persist");
        };
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        let mut merged = Self::read_file(path)?.unwrap_or_default();
        merge(&mut merged, patch);
        let text = toml::to_string_pretty(&merged).context("serialize toml")?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
        self.reload_all()
    }
}

/// Builds a one-field patch from a dotted path, as used by `config set`.
pub fn patch_for(path: &str, value: &str) -> Result<Config> {
    let mut patch = Config::default();
    match path {
        "storage.dir" => patch.storage.dir = Some(PathBuf::from(value)),
        "storage.key" => patch.storage.key = Some(value.to_string()),
        "autosave.debounce_ms" => patch.autosave.debounce_ms = Some(value.parse().context("debounce_ms must be a number")?),
        "autosave.retry_once" => patch.autosave.retry_once = Some(value.parse().context("retry_once must be true or false")?),
        "autosave.retry_delay_ms" => patch.autosave.retry_delay_ms = Some(value.parse().context("retry_delay_ms must be a number")?),
        "list.seed_defaults" => patch.list.seed_defaults = Some(value.parse().context("seed_defaults must be true or false")?),
        "logging.filter" => patch.logging.filter = Some(value.to_string()),
        _ => anyhow::bail!("unsupported config path: {}", path),
    }
    Ok(patch)
}
