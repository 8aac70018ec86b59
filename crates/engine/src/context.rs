// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context assembler: build an agent's context bundle under a char budget.
//!
//! Layers are assembled in order — `seed` always, `optional` while budget
//! allows, `deep` only when the caller asks. Refs resolve through a chain
//! of resolvers (filesystem first; others pluggable).

use aof_core::Task;
use aof_storage::render_record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Truncation marker appended when a section is cut to fit the budget.
pub const TRUNCATION_NOTICE: &str = "[Content truncated due to character budget]";

/// Minimum room left in the budget for a truncated section to be worth
/// emitting at all.
const MIN_TRUNCATED_CHARS: usize = 100;

/// Context layer, in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLayer {
    Seed,
    Optional,
    Deep,
}

/// A pre-declared manifest (`inputs/context-manifest.json`): which refs
/// live in which layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextManifest {
    #[serde(default)]
    pub seed: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default)]
    pub deep: Vec<String>,
}

impl ContextManifest {
    fn layer(&self, layer: ContextLayer) -> &[String] {
        match layer {
            ContextLayer::Seed => &self.seed,
            ContextLayer::Optional => &self.optional,
            ContextLayer::Deep => &self.deep,
        }
    }
}

/// A resolver turns a ref into content, or declines with `NotFound`.
pub trait ContextResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<String>;
}

/// Filesystem resolver rooted at the task's side-channel directory.
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContextResolver for FsResolver {
    fn resolve(&self, reference: &str) -> Option<String> {
        let path = self.root.join(reference);
        // Refuse to escape the root.
        if reference.split('/').any(|part| part == "..") {
            return None;
        }
        fs::read_to_string(path).ok()
    }
}

/// Options for one assembly.
pub struct AssembleOptions {
    pub max_chars: Option<usize>,
    /// Include the `deep` layer.
    pub include_deep: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            max_chars: None,
            include_deep: false,
        }
    }
}

/// The assembled bundle.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub summary: String,
    pub manifest: ContextManifest,
    pub total_chars: usize,
    /// Refs actually included, in order, with the layer they came from.
    pub sources: Vec<(String, ContextLayer)>,
}

/// Load a manifest from `inputs/context-manifest.json`, or default every
/// `inputs/` file into `seed`.
pub fn load_or_default_manifest(task_dir: &Path) -> ContextManifest {
    let manifest_path = task_dir.join("inputs/context-manifest.json");
    if let Ok(raw) = fs::read_to_string(&manifest_path) {
        if let Ok(manifest) = serde_json::from_str(&raw) {
            return manifest;
        }
    }

    let mut manifest = ContextManifest::default();
    if let Ok(entries) = fs::read_dir(task_dir.join("inputs")) {
        let mut refs: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(|n| format!("inputs/{n}")))
            .filter(|r| !r.ends_with("context-manifest.json"))
            .collect();
        refs.sort();
        manifest.seed = refs;
    }
    manifest
}

/// Assemble a context bundle for a task.
///
/// The task card (frontmatter + body) always leads. `bundle.total_chars`
/// never exceeds `max_chars`.
pub fn assemble(
    task: &Task,
    manifest: &ContextManifest,
    resolvers: &[&dyn ContextResolver],
    opts: &AssembleOptions,
) -> ContextBundle {
    let mut out = String::new();
    let mut sources = Vec::new();
    let budget = opts.max_chars.unwrap_or(usize::MAX);

    // Task card first; it participates in the budget like everything else.
    let card = render_record(task).unwrap_or_else(|_| task.body.clone());
    append_section(&mut out, &card, budget);

    let mut layers = vec![ContextLayer::Seed, ContextLayer::Optional];
    if opts.include_deep {
        layers.push(ContextLayer::Deep);
    }

    // Dedup refs that appear in more than one layer; first layer wins.
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for layer in layers {
        for reference in manifest.layer(layer) {
            if seen.contains_key(reference.as_str()) {
                continue;
            }
            seen.insert(reference, ());

            let Some(content) = resolvers.iter().find_map(|r| r.resolve(reference)) else {
                continue;
            };
            let section = format!("\n--- {reference} ---\n{content}");
            if append_section(&mut out, &section, budget) {
                sources.push((reference.clone(), layer));
            }
            if out.len() >= budget {
                break;
            }
        }
    }

    ContextBundle {
        total_chars: out.len(),
        summary: out,
        manifest: manifest.clone(),
        sources,
    }
}

/// Append `section`, truncating to the remaining budget when needed.
///
/// Returns whether anything was appended. A truncated section is only
/// emitted when at least [`MIN_TRUNCATED_CHARS`] remain.
fn append_section(out: &mut String, section: &str, budget: usize) -> bool {
    let remaining = budget.saturating_sub(out.len());
    if section.len() <= remaining {
        out.push_str(section);
        return true;
    }
    let notice_len = TRUNCATION_NOTICE.len() + 1;
    if remaining < MIN_TRUNCATED_CHARS || remaining <= notice_len {
        return false;
    }
    let keep = remaining - notice_len;
    // Cut on a char boundary at or below the keep point.
    let mut cut = keep;
    while cut > 0 && !section.is_char_boundary(cut) {
        cut -= 1;
    }
    out.push_str(&section[..cut]);
    out.push('\n');
    out.push_str(TRUNCATION_NOTICE);
    true
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
