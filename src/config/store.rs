use crate::error::AppError;
use crate::models::Rule;
use crate::validation::{validate_category_id, validate_executable_match, validate_rule_name};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Rule store shared between the daemon's reload task and the dispatch loop.
pub type SharedStore = Arc<RwLock<ConfigStore>>;

/// Ordered set of tracked-application rules.
///
/// Rules are kept in scan order and no two rules share an executable match
/// (compared case-insensitively). Mutations that would break that are rejected
/// and leave the store untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    rules: Vec<Rule>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an untrusted list, e.g. a rules file edited by hand.
    /// Invalid rules and later duplicates of an executable are dropped.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut store = Self::new();
        for rule in rules {
            let name = rule.name.clone();
            let rule = match normalize(rule) {
                Ok(rule) => rule,
                Err(e) => {
                    warn!("Ignoring rule '{name}': {e}");
                    continue;
                }
            };
            if let Some(existing) = store.find(&rule.executable_match) {
                warn!(
                    "Ignoring rule '{}': executable '{}' already tracked by '{}'",
                    rule.name, rule.executable_match, existing.name
                );
                continue;
            }
            store.rules.push(rule);
        }
        store.sort();
        store
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Copy of the rule list for one scan cycle.
    pub fn snapshot(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by executable match, case-insensitively.
    pub fn find(&self, executable_match: &str) -> Option<&Rule> {
        let key = executable_match.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.executable_match.to_lowercase() == key)
    }

    pub fn insert(&mut self, rule: Rule) -> Result<(), AppError> {
        let rule = normalize(rule)?;
        if let Some(existing) = self.rules.iter().find(|r| r.collides_with(&rule)) {
            return Err(AppError::AlreadyExists {
                executable: rule.executable_match,
                existing: existing.name.clone(),
            });
        }
        self.rules.push(rule);
        self.sort();
        Ok(())
    }

    /// Replace the rule currently tracking `executable_match`.
    pub fn update(&mut self, executable_match: &str, rule: Rule) -> Result<(), AppError> {
        let rule = normalize(rule)?;
        let key = executable_match.to_lowercase();
        let index = self
            .rules
            .iter()
            .position(|r| r.executable_match.to_lowercase() == key)
            .ok_or(AppError::NotFound { entity: "Rule" })?;

        let conflict = self
            .rules
            .iter()
            .enumerate()
            .find(|(i, r)| *i != index && r.collides_with(&rule));
        if let Some((_, existing)) = conflict {
            return Err(AppError::AlreadyExists {
                executable: rule.executable_match,
                existing: existing.name.clone(),
            });
        }

        if let Some(slot) = self.rules.get_mut(index) {
            *slot = rule;
        }
        self.sort();
        Ok(())
    }

    pub fn remove(&mut self, executable_match: &str) -> Result<Rule, AppError> {
        let key = executable_match.to_lowercase();
        let index = self
            .rules
            .iter()
            .position(|r| r.executable_match.to_lowercase() == key)
            .ok_or(AppError::NotFound { entity: "Rule" })?;
        Ok(self.rules.remove(index))
    }

    fn sort(&mut self) {
        self.rules.sort_by(Rule::scan_order);
    }

    /// Read rules from a JSON array. A missing file is an empty store.
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No rules file at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let rules: Vec<Rule> = serde_json::from_str(&contents)?;
        Ok(Self::from_rules(rules))
    }

    /// Like [`read`](Self::read), but an unreadable or unparseable file is an
    /// empty store.
    pub fn load(path: &Path) -> Self {
        Self::read(path).unwrap_or_else(|e| {
            warn!("Failed to load rules from {}: {e}", path.display());
            Self::new()
        })
    }

    /// The rules as they are written to disk: a flat JSON array.
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }

    /// Write the rules as a flat JSON array. The file is replaced atomically.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }
}

/// Read access that survives a poisoned lock.
pub fn read_store(store: &SharedStore) -> RwLockReadGuard<'_, ConfigStore> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_store(store: &SharedStore) -> RwLockWriteGuard<'_, ConfigStore> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}

fn normalize(rule: Rule) -> Result<Rule, AppError> {
    let name = validate_rule_name(&rule.name)?.to_string();
    let category_id = validate_category_id(&rule.category_id)?.to_string();
    let executable_match = validate_executable_match(&rule.executable_match)?.to_string();
    let artwork_path = rule
        .artwork_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    Ok(Rule {
        priority: rule.priority,
        name,
        category_id,
        executable_match,
        artwork_path,
    })
}
