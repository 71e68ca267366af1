// SPDX-License-Identifier: AGPL-3.0-or-later
//! Search strategies and subtree extraction
//!
//! A strategy is a predicate pair over file names and folder paths. The
//! ignore list prunes platform artifacts during full tree listings; the
//! machine and tool strategies select the subset of an already built tree
//! that belongs to a machine or tool.

use regex::Regex;
use tracing::debug;

use crate::config::{SearchSettings, StrategyMode};
use crate::entry::DocumentFolder;
use crate::error::{RepoError, RepoResult};

/// Predicate pair deciding which entries belong in a result
pub trait SearchPattern: Send + Sync {
    /// Tested against a bare file name
    fn is_file_required(&self, name: &str) -> bool;

    /// Tested against a folder's full path
    fn is_folder_required(&self, name: &str) -> bool;

    /// Unit of match used by [`extract`]
    fn mode(&self) -> StrategyMode;
}

/// Hides files whose name equals or starts with an ignored entry
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    ignored: Vec<String>,
}

impl IgnoreList {
    pub fn new<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(settings.ignored_resources.iter().cloned())
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored
            .iter()
            .filter(|entry| !entry.is_empty())
            .any(|entry| name.starts_with(entry.as_str()))
    }
}

impl SearchPattern for IgnoreList {
    fn is_file_required(&self, name: &str) -> bool {
        !self.is_ignored(name)
    }

    fn is_folder_required(&self, _name: &str) -> bool {
        true
    }

    fn mode(&self) -> StrategyMode {
        StrategyMode::Filename
    }
}

/// Anchored regex plus the mode deciding which side it applies to
#[derive(Debug, Clone)]
struct PatternMatcher {
    regex: Regex,
    mode: StrategyMode,
}

impl PatternMatcher {
    fn compile(pattern: &str, mode: StrategyMode) -> RepoResult<Self> {
        debug!("Search pattern ({:?}): {}", mode, pattern);
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| RepoError::InvalidPattern(e.to_string()))?;
        Ok(Self { regex, mode })
    }

    fn is_file_required(&self, name: &str) -> bool {
        match self.mode {
            StrategyMode::Folder | StrategyMode::FolderAndFilename => false,
            StrategyMode::Filename => {
                let hit = self.regex.is_match(name);
                if hit {
                    debug!("Filename match: {}", name);
                }
                hit
            }
        }
    }

    fn is_folder_required(&self, path: &str) -> bool {
        match self.mode {
            StrategyMode::Folder | StrategyMode::FolderAndFilename => self.regex.is_match(path),
            StrategyMode::Filename => true,
        }
    }
}

/// Matches the subtree of one machine and tool (order)
#[derive(Debug, Clone)]
pub struct MachineAndOrder {
    matcher: PatternMatcher,
}

impl MachineAndOrder {
    /// Pattern is `prefix + machine + joint + tool + suffix`; an empty joint
    /// becomes `.*`.
    pub fn new(machine: &str, tool: &str, settings: &SearchSettings) -> RepoResult<Self> {
        let table = &settings.pattern;
        let joint = if table.joint().is_empty() { ".*" } else { table.joint() };
        let pattern = format!("{}{}{}{}{}", table.prefix(), machine, joint, tool, table.suffix());
        Ok(Self {
            matcher: PatternMatcher::compile(&pattern, settings.strategy)?,
        })
    }
}

impl SearchPattern for MachineAndOrder {
    fn is_file_required(&self, name: &str) -> bool {
        self.matcher.is_file_required(name)
    }

    fn is_folder_required(&self, name: &str) -> bool {
        self.matcher.is_folder_required(name)
    }

    fn mode(&self) -> StrategyMode {
        self.matcher.mode
    }
}

/// Matches everything belonging to one tool
#[derive(Debug, Clone)]
pub struct Tool {
    matcher: PatternMatcher,
}

impl Tool {
    /// Pattern is `prefix + tool + suffix`
    pub fn new(tool: &str, settings: &SearchSettings) -> RepoResult<Self> {
        let table = &settings.pattern;
        let pattern = format!("{}{}{}", table.prefix(), tool, table.suffix());
        Ok(Self {
            matcher: PatternMatcher::compile(&pattern, settings.strategy)?,
        })
    }
}

impl SearchPattern for Tool {
    fn is_file_required(&self, name: &str) -> bool {
        self.matcher.is_file_required(name)
    }

    fn is_folder_required(&self, name: &str) -> bool {
        self.matcher.is_folder_required(name)
    }

    fn mode(&self) -> StrategyMode {
        self.matcher.mode
    }
}

/// Select the matching subset of a materialized tree.
///
/// In folder modes at most one child folder is taken per level: once a child
/// matches, later siblings at that level are not appended, though every child
/// is still descended into. In filename mode every matching file of every
/// child folder is collected. The root's own files are never scanned.
pub fn extract(tree: &DocumentFolder, strategy: &dyn SearchPattern) -> DocumentFolder {
    let mut result = DocumentFolder::new(tree.id.clone(), tree.path.clone(), tree.title.clone());
    collect(&mut result, tree, strategy);
    if result.is_empty() {
        debug!("Nothing matched below {}", tree.full_path());
    }
    result
}

fn collect(result: &mut DocumentFolder, folder: &DocumentFolder, strategy: &dyn SearchPattern) {
    let mode = strategy.mode();
    let mut matched_at_level = false;

    for child in &folder.folder_list {
        if mode.targets_folders() {
            if !matched_at_level && strategy.is_folder_required(&child.full_path()) {
                debug!("Folder match: {}", child.full_path());
                result.folder_list.push(child.clone());
                matched_at_level = true;
            }
        } else if mode.targets_files() {
            result.document_list.extend(
                child
                    .document_list
                    .iter()
                    .filter(|file| strategy.is_file_required(&file.title))
                    .cloned(),
            );
        }
        collect(result, child, strategy);
    }
}
