use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GraphError;
use crate::variant::Variant;

/// Observable effects of a module body, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectScript {
    /// Emitted synchronously when the body starts.
    pub before: String,
    /// Emitted after the single suspension point, if the body suspends.
    #[serde(default)]
    pub resume: Option<String>,
    /// Deferred event scheduled once the synchronous part of the body is over.
    #[serde(default)]
    pub after: Option<String>,
}

impl EffectScript {
    pub fn suspends(&self) -> bool {
        self.resume.is_some()
    }
}

/// A named evaluatable unit with ordered import edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub imports: Vec<String>,
    pub effects: EffectScript,
}

impl Module {
    /// Build a module whose events are labelled `"<name> before"`,
    /// `"<name> in between"` and `"<name> after"`.
    pub fn new(name: &str, imports: &[&str], suspends: bool, deferred: bool) -> Self {
        Module {
            name: name.to_string(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            effects: EffectScript {
                before: format!("{name} before"),
                resume: suspends.then(|| format!("{name} in between")),
                after: deferred.then(|| format!("{name} after")),
            },
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.mjs", self.name)
    }

    /// Render the module as an ES module script using the `tlaTrace` hook.
    pub fn source(&self) -> String {
        let mut code = String::new();
        code.push_str(&format!("tlaTrace({})\n", quote(&self.effects.before)));
        if let Some(resume) = &self.effects.resume {
            code.push_str("await 0\n");
            code.push_str(&format!("tlaTrace({})\n", quote(resume)));
        }
        if let Some(after) = &self.effects.after {
            code.push_str("Promise.resolve().then(() => {\n");
            code.push_str(&format!("  tlaTrace({})\n", quote(after)));
            code.push_str("})\n");
        }
        for import in &self.imports {
            code.push_str(&format!("import \"./{import}.mjs\"\n"));
        }
        code
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// A generated module graph. The last module is the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub variant: Variant,
    pub modules: Vec<Module>,
}

impl TestCase {
    /// Create a test case, rejecting graphs that cannot be resolved.
    pub fn new(variant: Variant, modules: Vec<Module>) -> Result<Self, GraphError> {
        let case = TestCase { variant, modules };
        case.validate()?;
        Ok(case)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        self.resolve().map(|_| ())
    }

    pub fn entry(&self) -> Option<&Module> {
        self.modules.last()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.name == name)
    }

    /// Resolve import names into an index-addressed table.
    pub fn resolve(&self) -> Result<ModuleTable, GraphError> {
        if self.modules.is_empty() {
            return Err(GraphError::Empty);
        }
        let mut seen = BTreeSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(GraphError::DuplicateModule(module.name.clone()));
            }
        }

        let mut imports = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            let mut edges = Vec::with_capacity(module.imports.len());
            for import in &module.imports {
                let idx = self
                    .index_of(import)
                    .ok_or_else(|| GraphError::UnknownImport {
                        module: module.name.clone(),
                        import: import.clone(),
                    })?;
                edges.push(idx);
            }
            imports.push(edges);
        }

        Ok(ModuleTable {
            names: self.modules.iter().map(|m| m.name.clone()).collect(),
            imports,
            entry: self.modules.len() - 1,
        })
    }

    /// `(file name, source)` for every module, in insertion order.
    pub fn sources(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .map(|m| (m.file_name(), m.source()))
            .collect()
    }

    /// SHA-256 over the module contents, stable across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for module in &self.modules {
            hasher.update(module.name.as_bytes());
            hasher.update([0u8]);
            for import in &module.imports {
                hasher.update(import.as_bytes());
                hasher.update([1u8]);
            }
            hasher.update(module.effects.before.as_bytes());
            if let Some(resume) = &module.effects.resume {
                hasher.update([2u8]);
                hasher.update(resume.as_bytes());
            }
            if let Some(after) = &module.effects.after {
                hasher.update([3u8]);
                hasher.update(after.as_bytes());
            }
            hasher.update([0xffu8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Index-addressed view of a [`TestCase`] used by evaluators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTable {
    pub names: Vec<String>,
    /// Import edges per module, in declared order, duplicates kept.
    pub imports: Vec<Vec<usize>>,
    pub entry: usize,
}

impl ModuleTable {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Import edges with repeated targets removed, first occurrence wins.
    pub fn unique_imports(&self, module: usize) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        self.imports[module]
            .iter()
            .copied()
            .filter(|idx| seen.insert(*idx))
            .collect()
    }
}
