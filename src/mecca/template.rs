//! Compiled templates and the shared template store.
//!
//! A [`CompiledTemplate`] is immutable once built and is shared by `Arc`
//! between every execution running it. The store swaps whole entries under a
//! lock, so a lookup sees either the old template or the new one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};
use tokio::fs;

use super::error::{CompileError, RunError};
use super::lex::lex;
use super::token::{Instruction, Kind};
use super::tokenize::tokenize;
use crate::metrics;

/// File extension of template sources under the template root.
pub const TEMPLATE_EXTENSION: &str = "mec";

#[derive(Debug)]
pub struct CompiledTemplate {
    name: String,
    source: String,
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl CompiledTemplate {
    /// Lex and tokenize `source`, then index its labels.
    pub fn compile(name: &str, source: &str) -> Result<Self, CompileError> {
        let spans = lex(source)?;
        let instructions = tokenize(spans)?;

        let mut labels = HashMap::new();
        for (idx, instruction) in instructions.iter().enumerate() {
            if instruction.kind == Kind::Label {
                if let Some(previous) = labels.insert(instruction.raw_name.clone(), idx) {
                    debug!(
                        "template {}: label '{}' redeclared (was {}, now {})",
                        name, instruction.raw_name, previous, idx
                    );
                }
            }
        }

        Ok(CompiledTemplate {
            name: name.to_string(),
            source: source.to_string(),
            instructions,
            labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Position of the named label, if declared.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }
}

/// Name → compiled template map shared by every session.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    root: Option<PathBuf>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that can load `<root>/<name>.mec` on demand.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { templates: RwLock::new(HashMap::new()), root: Some(root.into()) }
    }

    /// Compile `source` and install it under `name`, replacing any previous entry.
    /// On failure the store is left untouched.
    pub fn compile(&self, name: &str, source: &str) -> Result<Arc<CompiledTemplate>, CompileError> {
        let name = normalize_name(name);
        let compiled = match CompiledTemplate::compile(name, source) {
            Ok(compiled) => Arc::new(compiled),
            Err(e) => {
                metrics::inc_compile_failures();
                return Err(e);
            }
        };
        let mut templates = self.templates.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        templates.insert(name.to_string(), Arc::clone(&compiled));
        metrics::inc_templates_compiled();
        debug!(
            "compiled template {} ({} instructions, {} labels)",
            name,
            compiled.len(),
            compiled.labels.len()
        );
        Ok(compiled)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<CompiledTemplate>, RunError> {
        let name = normalize_name(name);
        let templates = self.templates.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        templates.get(name).cloned().ok_or_else(|| RunError::NotCompiled(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Sorted names of every compiled template.
    pub fn names(&self) -> Vec<String> {
        let templates = self.templates.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read `<root>/<name>.mec` and compile it under `name`.
    pub async fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, CompileError> {
        let name = normalize_name(name);
        let Some(root) = &self.root else {
            return Err(CompileError::Io {
                name: name.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no template root configured",
                ),
            });
        };
        let path = root.join(format!("{}.{}", name, TEMPLATE_EXTENSION));
        let source = fs::read_to_string(&path)
            .await
            .map_err(|e| CompileError::Io { name: name.to_string(), source: e })?;
        self.compile(name, &source)
    }

    /// Look `name` up, loading it from the template root on first reference.
    pub async fn get_or_load(&self, name: &str) -> Result<Arc<CompiledTemplate>, RunError> {
        if let Ok(template) = self.lookup(name) {
            return Ok(template);
        }
        if self.root.is_none() {
            return Err(RunError::NotCompiled(normalize_name(name).to_string()));
        }
        self.load(name).await.map_err(|e| {
            warn!("template {} could not be loaded: {}", name, e);
            RunError::NotCompiled(normalize_name(name).to_string())
        })
    }

    /// Compile every `.mec` file below the template root. Failures are logged and
    /// skipped. Returns `(compiled, failed)`.
    pub async fn load_all(&self) -> std::io::Result<(usize, usize)> {
        let Some(root) = self.root.clone() else {
            return Ok((0, 0));
        };
        let (mut compiled, mut failed) = (0, 0);
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                    continue;
                }
                let Some(name) = template_name(&root, &path) else { continue };
                match self.load(&name).await {
                    Ok(_) => compiled += 1,
                    Err(e) => {
                        warn!("skipping template {}: {}", path.display(), e);
                        failed += 1;
                    }
                }
            }
        }
        info!("loaded {} templates from {} ({} failed)", compiled, root.display(), failed);
        Ok((compiled, failed))
    }
}

fn normalize_name(name: &str) -> &str {
    name.strip_suffix(".mec").unwrap_or(name)
}

/// `root/misc/logo.mec` → `misc/logo`.
fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<&str> = relative.components().filter_map(|c| c.as_os_str().to_str()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_indexed_last_wins() {
        let t = CompiledTemplate::compile("t", "[/a]x[/b]y[/a]").unwrap();
        assert_eq!(t.label("a"), Some(4));
        assert_eq!(t.label("b"), Some(2));
        assert_eq!(t.instructions()[4].kind, Kind::Label);
        assert_eq!(t.label("missing"), None);
    }

    #[test]
    fn failed_recompile_keeps_previous_entry() {
        let store = TemplateStore::new();
        store.compile("menu", "first").unwrap();
        assert!(store.compile("menu", "broken [white").is_err());
        let kept = store.lookup("menu").unwrap();
        assert_eq!(kept.source(), "first");
    }

    #[test]
    fn recompile_replaces_entry_but_not_held_references() {
        let store = TemplateStore::new();
        let old = store.compile("menu", "old").unwrap();
        store.compile("menu", "new").unwrap();
        assert_eq!(old.source(), "old");
        assert_eq!(store.lookup("menu").unwrap().source(), "new");
    }

    #[test]
    fn extension_is_ignored_in_names() {
        let store = TemplateStore::new();
        store.compile("misc/logo.mec", "hi").unwrap();
        assert!(store.contains("misc/logo"));
        assert_eq!(store.names(), vec!["misc/logo".to_string()]);
        assert_eq!(store.lookup("nope").unwrap_err(), RunError::NotCompiled("nope".into()));
    }

    #[test]
    fn template_name_from_path() {
        let root = Path::new("/srv/mec");
        assert_eq!(
            template_name(root, Path::new("/srv/mec/misc/logo.mec")),
            Some("misc/logo".into())
        );
    }
}
