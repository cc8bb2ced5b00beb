use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maps a note title to the vault-relative path of the note it names.
///
/// Unknown titles resolve to `None`; resolution never fails.
pub trait TitleResolver: Send + Sync {
    fn resolve_title(&self, title: &str) -> Option<String>;
}

/// A directory of markdown notes, scanned once and rescanned on demand.
pub struct Vault {
    root: PathBuf,
    /// Vault-relative note paths, `/`-separated, sorted
    notes: RwLock<Vec<String>>,
}

impl Vault {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Vault directory {} does not exist", root.display());
        }
        let vault = Self {
            root: root.to_path_buf(),
            notes: RwLock::new(Vec::new()),
        };
        vault.refresh()?;
        Ok(vault)
    }

    /// Rescan the vault directory. Returns the number of notes found.
    pub fn refresh(&self) -> Result<usize> {
        let notes = scan_notes(&self.root)
            .with_context(|| format!("Failed to scan vault {}", self.root.display()))?;
        let count = notes.len();
        *self.notes.write() = notes;
        tracing::info!("Vault {} holds {count} notes", self.root.display());
        Ok(count)
    }

    pub fn note_count(&self) -> usize {
        self.notes.read().len()
    }
}

impl TitleResolver for Vault {
    fn resolve_title(&self, title: &str) -> Option<String> {
        let notes = self.notes.read();
        resolve_in(&notes, title)
    }
}

fn scan_notes(root: &Path) -> Result<Vec<String>> {
    let mut notes = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_note(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        notes.push(parts.join("/"));
    }

    notes.sort();
    Ok(notes)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_note(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

/// Drop a trailing `.md` in any case, matching what `is_note` accepts.
fn strip_md(path: &str) -> &str {
    match path.len().checked_sub(3) {
        Some(cut) if path.is_char_boundary(cut) && path[cut..].eq_ignore_ascii_case(".md") => {
            &path[..cut]
        }
        _ => path,
    }
}

fn stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    strip_md(name)
}

/// Resolution order: exact path, path suffix, exact stem, case-insensitive stem.
/// Ties go to the shortest path, then lexicographic order.
fn resolve_in(notes: &[String], title: &str) -> Option<String> {
    let title = title.trim().replace('\\', "/");
    let title = strip_md(&title);
    if title.is_empty() {
        return None;
    }

    if let Some(path) = notes.iter().find(|p| strip_md(p) == title) {
        return Some(path.clone());
    }

    if title.contains('/') {
        let suffix = format!("/{title}");
        return pick(notes.iter().filter(|p| strip_md(p).ends_with(&suffix)));
    }

    pick(notes.iter().filter(|p| stem(p) == title)).or_else(|| {
        let lowered = title.to_lowercase();
        pick(notes.iter().filter(|p| stem(p).to_lowercase() == lowered))
    })
}

fn pick<'a>(candidates: impl Iterator<Item = &'a String>) -> Option<String> {
    candidates
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}
