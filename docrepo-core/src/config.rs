// SPDX-License-Identifier: AGPL-3.0-or-later
//! Repository configuration
//!
//! Built once at startup (usually from a TOML file) and shared read-only as
//! `Arc<Settings>` with every handler and strategy.

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, RepoResult};
use crate::path::PathConvention;

/// Number of slots in the search pattern table
pub const PATTERN_SLOTS: usize = 5;

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cmis: CmisSettings,
    pub smb: SmbSettings,
    pub search: SearchSettings,
}

impl Settings {
    pub fn from_toml_str(source: &str) -> RepoResult<Self> {
        toml::from_str(source).map_err(|e| RepoError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        tracing::info!("Loading settings from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

/// Content-management server (browser binding) settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CmisSettings {
    pub user: String,
    pub password: String,
    /// Browser binding URL
    pub host: String,
    pub repository_id: String,
}

impl CmisSettings {
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

impl Default for CmisSettings {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: String::new(),
            repository_id: "default".to_string(),
        }
    }
}

/// File-share settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmbSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub share: String,
    pub domain: String,
    /// Separator convention of the server
    pub system: PathConvention,
    /// Local mount of the share
    pub mount_point: Option<PathBuf>,
}

impl Default for SmbSettings {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: String::new(),
            share: "Share".to_string(),
            domain: String::new(),
            system: PathConvention::Windows,
            mount_point: None,
        }
    }
}

/// Unit of match for the machine/tool strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyMode {
    Folder,
    FolderAndFilename,
    #[default]
    Filename,
}

impl StrategyMode {
    pub fn targets_folders(&self) -> bool {
        matches!(self, StrategyMode::Folder | StrategyMode::FolderAndFilename)
    }

    pub fn targets_files(&self) -> bool {
        matches!(self, StrategyMode::Filename)
    }
}

/// Search settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Name prefixes hidden from tree listings
    #[serde(deserialize_with = "words_or_list")]
    pub ignored_resources: Vec<String>,
    pub strategy: StrategyMode,
    pub pattern: PatternTable,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            ignored_resources: vec![".DS_Store".to_string(), "._".to_string()],
            strategy: StrategyMode::default(),
            pattern: PatternTable::default(),
        }
    }
}

/// Regex fragments interpolated around machine and tool identifiers.
///
/// Slot 3 is the prefix and slot 4 the suffix of every pattern; slot 2 joins
/// machine and tool. Slots 0 and 1 are carried but unused.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPatternTable")]
pub struct PatternTable {
    slots: Vec<String>,
}

impl PatternTable {
    pub fn new<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots: Vec<String> = slots.into_iter().map(Into::into).collect();
        slots.resize(slots.len().max(PATTERN_SLOTS), String::new());
        Self { slots }
    }

    /// Parse a newline separated block; slots 1 to 4 lose all whitespace
    pub fn from_block(block: &str) -> Self {
        let slots = block.split('\n').enumerate().map(|(i, line)| {
            if (1..PATTERN_SLOTS).contains(&i) {
                line.split_whitespace().collect::<String>()
            } else {
                line.to_string()
            }
        });
        Self::new(slots)
    }

    pub fn slot(&self, index: usize) -> &str {
        self.slots.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn prefix(&self) -> &str {
        self.slot(3)
    }

    pub fn suffix(&self) -> &str {
        self.slot(4)
    }

    pub fn joint(&self) -> &str {
        self.slot(2)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new(["", "", "", ".*", ".*\\.pdf"])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPatternTable {
    Slots(Vec<String>),
    Block(String),
}

impl From<RawPatternTable> for PatternTable {
    fn from(raw: RawPatternTable) -> Self {
        match raw {
            RawPatternTable::Slots(slots) => PatternTable::new(slots),
            RawPatternTable::Block(block) => PatternTable::from_block(&block),
        }
    }
}

fn words_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Words(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(list) => list,
        Raw::Words(words) => words.split_whitespace().map(String::from).collect(),
    })
}
