//! Stable unit identities, content hashes, and catalog diffing.
//!
//! Identity is the key units are matched by: across template
//! reconciliation, history tracking, and duplicate detection. It must be
//! deterministic and stable across parses of byte-identical input.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    traits::Warning,
    types::{Catalog, State, Unit},
};

/// How a catalog derives unit identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityRule {
    /// The format carries an explicit key per unit (monolingual key-value
    /// formats, XLIFF ids); identity is that key verbatim.
    NativeKey,
    /// No native key: identity is a hash over context and the full source
    /// tuple (gettext-style bilingual formats).
    ContextSource,
}

/// The identity of one unit under the given rule.
///
/// `ContextSource` hashes each component with a length prefix, so
/// `("ab", "c")` and `("a", "bc")` cannot collide.
pub fn unit_identity(unit: &Unit, rule: IdentityRule) -> String {
    match rule {
        IdentityRule::NativeKey => match unit.context() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => hash_context_source(unit),
        },
        IdentityRule::ContextSource => hash_context_source(unit),
    }
}

fn hash_context_source(unit: &Unit) -> String {
    let mut hasher = Sha256::new();
    let context = unit.context().unwrap_or("");
    hasher.update((context.len() as u64).to_le_bytes());
    hasher.update(context.as_bytes());
    for form in unit.source().forms() {
        hasher.update((form.len() as u64).to_le_bytes());
        hasher.update(form.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Lowercase hex SHA-256 over raw file bytes; the base for optimistic
/// write-back checks and cache keys.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Scans a catalog for duplicate identities among active units. The first
/// occurrence is canonical; each later one yields a warning.
pub fn scan_duplicates(catalog: &Catalog) -> Vec<Warning> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();
    for unit in catalog.active_units() {
        let identity = catalog.identity_of(unit);
        match seen.get(&identity) {
            Some(first) => warnings.push(Warning::DuplicateIdentity {
                identity,
                first_position: *first,
                duplicate_position: unit.position(),
            }),
            None => {
                seen.insert(identity, unit.position());
            }
        }
    }
    warnings
}

/// One changed unit in a catalog diff.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChangedUnit {
    pub identity: String,
    pub old_target: String,
    pub new_target: String,
    pub old_state: State,
    pub new_state: State,
}

/// Identity-level difference between two parses of the same logical file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiffReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<ChangedUnit>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compares two catalogs by identity, reporting added and removed
/// identities and units whose target or state changed. Identities are
/// derived under `new`'s identity rule; obsolete units are ignored.
pub fn diff_catalogs(old: &Catalog, new: &Catalog) -> DiffReport {
    let rule = new.meta.identity_rule;
    let mut old_units: HashMap<String, &Unit> = HashMap::new();
    let mut old_order: Vec<String> = Vec::new();
    for unit in old.active_units() {
        let identity = unit_identity(unit, rule);
        if !old_units.contains_key(&identity) {
            old_order.push(identity.clone());
            old_units.insert(identity, unit);
        }
    }

    let mut report = DiffReport::default();
    let mut seen_new: HashSet<String> = HashSet::new();
    for unit in new.active_units() {
        let identity = unit_identity(unit, rule);
        if !seen_new.insert(identity.clone()) {
            continue;
        }
        match old_units.get(&identity) {
            None => report.added.push(identity),
            Some(old_unit) => {
                if !old_unit.target_equals(unit) || old_unit.state() != unit.state() {
                    report.changed.push(ChangedUnit {
                        identity,
                        old_target: old_unit.target().to_string(),
                        new_target: unit.target().to_string(),
                        old_state: old_unit.state(),
                        new_state: unit.state(),
                    });
                }
            }
        }
    }
    for identity in old_order {
        if !seen_new.contains(&identity) {
            report.removed.push(identity);
        }
    }
    report
}
