use markdown_autoformat_engine::{
    BlockAutoformatter, DocumentChangeObserver, Editor, InlineAutoformatter,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Rule for pattern '{pattern}' has no command or attribute")]
    MissingAction { pattern: String },
}

/// Turns the block into something else when its leading text matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_blocks: Vec<String>,
}

/// Applies `attribute` to group 2 and strips groups 1 and 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRule {
    pub pattern: String,
    pub attribute: String,
}

/// The autoformat rules, as stored in `config.toml`:
///
/// ```toml
/// [[block]]
/// pattern = '^#\s$'
/// command = "heading1"
/// ignore_blocks = ["codeBlock"]
///
/// [[inline]]
/// pattern = '(?:^|\s)(\*\*)([^*_]+)(\*\*)$'
/// attribute = "bold"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoformatConfig {
    #[serde(default)]
    pub block: Vec<BlockRule>,
    #[serde(default)]
    pub inline: Vec<InlineRule>,
}

impl AutoformatConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        // Expand shell variables and tilde in the given path
        let config_path =
            Self::expand_path(config_path).unwrap_or_else(|| config_path.to_path_buf());
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.clone(),
                source,
            }
        })?;

        let config: AutoformatConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.clone(),
                source,
            })?;

        log::debug!(
            "loaded {} block and {} inline rule(s) from {}",
            config.block.len(),
            config.inline.len(),
            config_path.display()
        );
        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-autoformat");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    /// The usual markdown shortcuts: lists, headings, block quotes, and
    /// bold/italic/code/strikethrough spans.
    pub fn markdown() -> Self {
        let block = |pattern: &str, command: &str| BlockRule {
            pattern: pattern.to_string(),
            command: Some(command.to_string()),
            ignore_blocks: vec!["codeBlock".to_string()],
        };
        let inline = |pattern: &str, attribute: &str| InlineRule {
            pattern: pattern.to_string(),
            attribute: attribute.to_string(),
        };

        Self {
            block: vec![
                block(r"^[*-]\s$", "bulletedList"),
                block(r"^1[.)]\s$", "numberedList"),
                block(r"^#\s$", "heading1"),
                block(r"^##\s$", "heading2"),
                block(r"^###\s$", "heading3"),
                block(r"^>\s$", "blockQuote"),
            ],
            inline: vec![
                inline(r"(?:^|\s)(\*\*)([^*_]+)(\*\*)$", "bold"),
                inline(r"(?:^|\s)(__)([^*_]+)(__)$", "bold"),
                inline(r"(?:^|\s)(\*)([^*_]+)(\*)$", "italic"),
                inline(r"(?:^|\s)(_)([^*_]+)(_)$", "italic"),
                inline(r"(?:^|\s)(`)([^`]+)(`)$", "code"),
                inline(r"(?:^|\s)(~~)([^~]+)(~~)$", "strikethrough"),
            ],
        }
    }

    /// Names of every command the block rules run, without duplicates.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.block.iter().filter_map(|rule| rule.command.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Compile every rule and subscribe the resulting autoformatters to
    /// `editor`. Nothing is attached unless every rule compiles.
    ///
    /// Returns the number of autoformatters attached.
    pub fn install(&self, editor: &mut dyn Editor) -> Result<usize, ConfigError> {
        let mut formatters: Vec<Box<dyn DocumentChangeObserver>> = Vec::new();

        for rule in &self.block {
            let command = rule
                .command
                .as_deref()
                .filter(|command| !command.is_empty())
                .ok_or_else(|| ConfigError::MissingAction {
                    pattern: rule.pattern.clone(),
                })?;
            let formatter = BlockAutoformatter::new(compile(&rule.pattern)?, command)
                .ignore_blocks(rule.ignore_blocks.iter().cloned());
            formatters.push(Box::new(formatter));
        }

        for rule in &self.inline {
            if rule.attribute.is_empty() {
                return Err(ConfigError::MissingAction {
                    pattern: rule.pattern.clone(),
                });
            }
            let formatter =
                InlineAutoformatter::new(compile(&rule.pattern)?, rule.attribute.as_str());
            formatters.push(Box::new(formatter));
        }

        let installed = formatters.len();
        for formatter in formatters {
            editor.subscribe(formatter);
        }
        log::debug!("installed {installed} autoformatter(s)");
        Ok(installed)
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
