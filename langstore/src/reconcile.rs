//! Template reconciliation.
//!
//! A monolingual component has one template catalog (the source of truth
//! for keys and source text) and one translation catalog per language.
//! Reconciliation walks both by identity: translations keep their target,
//! state, and translator comment; everything non-translatable is adopted
//! from the template. New template keys are inserted, vanished ones are
//! removed or kept flagged obsolete by policy.
//!
//! Re-running against an unchanged template is a fixed point.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    flags::Flags,
    identity::unit_identity,
    plural,
    traits::Warning,
    types::{Catalog, Message, State, Unit},
};

/// What happens to translation units whose identity left the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObsoletePolicy {
    /// Retain the unit flagged obsolete; only drivers with obsolete
    /// support serialize it.
    #[default]
    Keep,
    /// Drop the unit from the catalog.
    Remove,
}

/// Configuration for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub obsolete: ObsoletePolicy,
    /// Component-level default flags, re-resolved after adoption.
    pub default_flags: Flags,
    /// Per-identity override flags; the highest merge layer.
    pub flag_overrides: BTreeMap<String, Flags>,
}

impl ReconcileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_obsolete_policy(mut self, policy: ObsoletePolicy) -> Self {
        self.obsolete = policy;
        self
    }

    pub fn with_default_flags(mut self, flags: Flags) -> Self {
        self.default_flags = flags;
        self
    }

    pub fn with_flag_override(mut self, identity: impl Into<String>, flags: Flags) -> Self {
        self.flag_overrides.insert(identity.into(), flags);
        self
    }
}

/// What one reconciliation run did, by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcileReport {
    /// Identities present in both template and translation.
    pub matched: Vec<String>,
    /// Template identities newly inserted into the translation.
    pub added: Vec<String>,
    /// Translation identities with no template counterpart, removed or
    /// newly flagged per policy.
    pub obsolete: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl ReconcileReport {
    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn obsolete_count(&self) -> usize {
        self.obsolete.len()
    }

    /// True when the run changed nothing structural.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.obsolete.is_empty()
    }
}

/// Reconciles `translation` against `template` in place.
///
/// Matching is by identity under the template's identity rule. The
/// translation's own unit order is preserved; added units are inserted at
/// positions consistent with template ordering. Positions are renumbered
/// and flags re-resolved before returning.
pub fn reconcile(
    template: &Catalog,
    translation: &mut Catalog,
    options: &ReconcileOptions,
) -> ReconcileReport {
    let rule = template.meta.identity_rule;
    let arity = plural::rules_for_str(&translation.meta.language).arity();
    let mut report = ReconcileReport::default();

    // Template index: first occurrence per identity is canonical.
    let mut template_order: Vec<(String, &Unit)> = Vec::new();
    let mut template_index: HashMap<String, usize> = HashMap::new();
    for unit in template.active_units() {
        let identity = unit_identity(unit, rule);
        match template_index.get(&identity) {
            Some(first) => report.warnings.push(Warning::DuplicateIdentity {
                identity,
                first_position: template_order[*first].1.position(),
                duplicate_position: unit.position(),
            }),
            None => {
                template_index.insert(identity.clone(), template_order.len());
                template_order.push((identity, unit));
            }
        }
    }

    // First occurrence per identity in the translation; later duplicates
    // are reported and left untouched.
    let mut first_in_translation: HashMap<String, usize> = HashMap::new();
    for (index, unit) in translation.units.iter().enumerate() {
        let identity = unit_identity(unit, rule);
        match first_in_translation.get(&identity) {
            Some(first) => report.warnings.push(Warning::DuplicateIdentity {
                identity,
                first_position: translation.units[*first].position(),
                duplicate_position: unit.position(),
            }),
            None => {
                first_in_translation.insert(identity, index);
            }
        }
    }

    for (index, unit) in translation.units.iter_mut().enumerate() {
        let identity = unit_identity(unit, rule);
        let is_first = first_in_translation
            .get(&identity)
            .is_some_and(|first| *first == index);
        match template_index.get(&identity) {
            Some(template_slot) if is_first => {
                let template_unit = template_order[*template_slot].1;
                adopt(unit, template_unit, arity, &identity, &mut report);
                report.matched.push(identity);
            }
            Some(_) => {}
            None => {
                if !unit.is_obsolete() {
                    report.obsolete.push(identity);
                    unit.set_obsolete(true);
                }
            }
        }
    }

    if options.obsolete == ObsoletePolicy::Remove {
        translation.units.retain(|unit| !unit.is_obsolete());
    }

    // Insert missing template units, keeping the matched subsequence in
    // template order.
    let mut anchor = 0usize;
    for (identity, template_unit) in &template_order {
        let found = translation
            .units
            .iter()
            .position(|unit| &unit_identity(unit, rule) == identity);
        match found {
            Some(position) => anchor = anchor.max(position + 1),
            None => {
                translation
                    .units
                    .insert(anchor, blank_translation(template_unit, arity));
                report.added.push(identity.clone());
                anchor += 1;
            }
        }
    }

    for unit in translation.units.iter_mut() {
        let identity = unit_identity(unit, rule);
        unit.resolve_flags(&options.default_flags, options.flag_overrides.get(&identity));
    }
    translation.renumber();

    report
}

/// Carries template metadata onto a matched unit: source, context,
/// locations, developer comment, and source-side flags. Target, state,
/// and the translator comment stay as translated.
fn adopt(
    unit: &mut Unit,
    template_unit: &Unit,
    arity: usize,
    identity: &str,
    report: &mut ReconcileReport,
) {
    unit.adopt_template_metadata(template_unit);
    unit.replace_source(template_unit.source().clone());
    unit.set_obsolete(false);

    // The source shape is authoritative; reshape the target when the
    // template switched between singular and plural.
    if unit.source().is_plural() {
        if !unit.target().is_plural() {
            let found = unit.target().forms().len();
            let mut forms = vec![String::new(); arity.max(1)];
            forms[0] = unit.target().first().to_string();
            unit.force_target(Message::plural(forms));
            report.warnings.push(Warning::PluralArityMismatch {
                key: identity.to_string(),
                expected: arity,
                found,
            });
        } else if unit.normalize_plural_target(arity) {
            report.warnings.push(Warning::PluralArityMismatch {
                key: identity.to_string(),
                expected: arity,
                found: unit.target().forms().len(),
            });
        }
    } else if unit.target().is_plural() {
        let found = unit.target().forms().len();
        let first = unit.target().first().to_string();
        unit.force_target(Message::singular(first));
        report.warnings.push(Warning::PluralArityMismatch {
            key: identity.to_string(),
            expected: 1,
            found,
        });
    }
}

/// A fresh untranslated unit for a template identity the translation
/// lacks: template metadata, blank target sized to the translation
/// language, `Empty` state.
fn blank_translation(template_unit: &Unit, arity: usize) -> Unit {
    let mut unit = template_unit.clone();
    let target = if unit.source().is_plural() {
        Message::plural(vec![String::new(); arity.max(1)])
    } else {
        Message::singular(String::new())
    };
    unit.force_target(target);
    unit.force_state(State::Empty);
    unit.set_translator_note(None);
    unit.set_obsolete(false);
    unit
}
