//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::app::inject::ControlStyle;
use crate::app::watch::DEFAULT_NAVIGATION_DELAY;
use crate::domain::errors::SelectorError;
use crate::domain::model::NormalizationOptions;
use crate::domain::rules::{BUILTIN_SELECTORS, RuleSet};
use crate::ui::toast::DEFAULT_HIDE_AFTER;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".snipcopy/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub normalize: Normalize,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub control: Control,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub watcher: Watcher,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalize {
    #[serde(default)]
    strip_shell: Option<bool>,
    #[serde(default)]
    strip_python: Option<bool>,
}

impl Normalize {
    pub fn strip_shell(&self) -> bool {
        self.strip_shell.unwrap_or(true)
    }

    pub fn strip_python(&self) -> bool {
        self.strip_python.unwrap_or(true)
    }

    pub fn options(&self) -> NormalizationOptions {
        NormalizationOptions {
            strip_shell: self.strip_shell(),
            strip_python: self.strip_python(),
        }
    }
}

/// Block detection rules. `selectors` replaces the built-in list; `extra` appends to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    selectors: Option<Vec<String>>,
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Rules {
    pub fn selectors(&self) -> Vec<String> {
        self.selectors.clone().unwrap_or_else(|| {
            BUILTIN_SELECTORS
                .iter()
                .map(|selector| (*selector).to_owned())
                .collect()
        })
    }

    /// Compile the effective rule list.
    pub fn compile(&self) -> Result<RuleSet, SelectorError> {
        let selectors = self.selectors();
        RuleSet::from_selectors(
            selectors
                .iter()
                .chain(self.extra.iter())
                .map(String::as_str),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    aria_label: Option<String>,
}

impl Control {
    pub fn style(&self) -> ControlStyle {
        let defaults = ControlStyle::default();
        ControlStyle {
            label: self.label.clone().unwrap_or(defaults.label),
            class_name: self.class_name.clone().unwrap_or(defaults.class_name),
            aria_label: self.aria_label.clone().unwrap_or(defaults.aria_label),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    hide_after_ms: Option<u64>,
}

impl Feedback {
    pub fn hide_after(&self) -> Duration {
        self.hide_after_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HIDE_AFTER)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watcher {
    #[serde(default)]
    navigation_delay_ms: Option<u64>,
}

impl Watcher {
    pub fn navigation_delay(&self) -> Duration {
        self.navigation_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_NAVIGATION_DELAY)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    strip_shell: Option<bool>,
    strip_python: Option<bool>,
    hide_after_ms: Option<u64>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            strip_shell: env_flag("SNIPCOPY_STRIP_SHELL"),
            strip_python: env_flag("SNIPCOPY_STRIP_PYTHON"),
            hide_after_ms: env::var("SNIPCOPY_HIDE_AFTER_MS")
                .ok()
                .and_then(|raw| raw.trim().parse().ok()),
        }
    }

    #[cfg(test)]
    fn for_tests(strip_shell: bool, hide_after_ms: u64) -> Self {
        Self {
            strip_shell: Some(strip_shell),
            strip_python: None,
            hide_after_ms: Some(hide_after_ms),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    parse_flag(&raw).or_else(|| {
        tracing::warn!(variable = name, value = %raw, "ignoring unrecognised boolean");
        None
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    /// Load defaults plus a single explicit file, then env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let explicit = Self::from_file(path)?;
        let merged = Self::from_str(&DEFAULT_CONFIG)?.merge(explicit);
        Ok(apply_env_overrides(merged, EnvOverrides::from_env()))
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading user config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            normalize: Normalize {
                strip_shell: other.normalize.strip_shell.or(self.normalize.strip_shell),
                strip_python: other.normalize.strip_python.or(self.normalize.strip_python),
            },
            rules: merge_rules(self.rules, other.rules),
            control: Control {
                label: other.control.label.or(self.control.label),
                class_name: other.control.class_name.or(self.control.class_name),
                aria_label: other.control.aria_label.or(self.control.aria_label),
            },
            feedback: Feedback {
                hide_after_ms: other.feedback.hide_after_ms.or(self.feedback.hide_after_ms),
            },
            watcher: Watcher {
                navigation_delay_ms: other
                    .watcher
                    .navigation_delay_ms
                    .or(self.watcher.navigation_delay_ms),
            },
        }
    }
}

fn merge_rules(base: Rules, overlay: Rules) -> Rules {
    let mut seen = BTreeSet::new();
    let extra = base
        .extra
        .into_iter()
        .chain(overlay.extra)
        .filter(|selector| seen.insert(selector.clone()))
        .collect();

    Rules {
        selectors: overlay.selectors.or(base.selectors),
        extra,
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("snipcopy/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(strip_shell) = env.strip_shell {
        config.normalize.strip_shell = Some(strip_shell);
    }
    if let Some(strip_python) = env.strip_python {
        config.normalize.strip_python = Some(strip_python);
    }
    if let Some(hide_after_ms) = env.hide_after_ms {
        config.feedback.hide_after_ms = Some(hide_after_ms);
    }
    config
}
