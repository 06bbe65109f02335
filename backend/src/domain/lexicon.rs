//! Checks a submitted scheme against the intervention lexicon.
//!
//! Before a scheme is assessed every feature must resolve to a lexicon entry
//! through its `_interventionTypeIndex`, and any `intervention` property it
//! carries must agree with that entry.

use std::collections::BTreeSet;

use sdca_scheme::{InterventionLexicon, InterventionType, parse_type_index};

use super::Scheme;

/// Ways a feature can fail to match the lexicon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexiconMismatch {
    /// No usable `_interventionTypeIndex`.
    #[error("feature {feature} has no intervention type")]
    MissingTypeIndex {
        /// Feature position.
        feature: usize,
    },
    /// The index is outside the lexicon.
    #[error("feature {feature} refers to unknown intervention type {index}")]
    UnknownType {
        /// Feature position.
        feature: usize,
        /// Offending index.
        index: usize,
    },
    /// The `intervention` property disagrees with the indexed entry.
    #[error("feature {feature} is marked '{found}' but its type is '{expected}'")]
    InterventionMismatch {
        /// Feature position.
        feature: usize,
        /// Identifier of the indexed entry.
        expected: String,
        /// Identifier on the feature.
        found: String,
    },
}

impl LexiconMismatch {
    /// Position of the offending feature.
    pub const fn feature(&self) -> usize {
        match self {
            Self::MissingTypeIndex { feature }
            | Self::UnknownType { feature, .. }
            | Self::InterventionMismatch { feature, .. } => *feature,
        }
    }
}

/// Resolves every feature of `scheme` to its lexicon entry, in order.
///
/// Empty coordinates cannot reach this point: [`Scheme`] construction
/// already refuses them.
pub fn validate_scheme<'a>(
    scheme: &Scheme,
    lexicon: &'a InterventionLexicon,
) -> Result<Vec<&'a InterventionType>, LexiconMismatch> {
    scheme
        .features()
        .iter()
        .enumerate()
        .map(|(feature, item)| {
            let index = item
                .type_index()
                .and_then(parse_type_index)
                .ok_or(LexiconMismatch::MissingTypeIndex { feature })?;
            let entry = lexicon
                .get(index)
                .ok_or(LexiconMismatch::UnknownType { feature, index })?;
            match item.intervention() {
                Some(found) if found != entry.intervention => {
                    Err(LexiconMismatch::InterventionMismatch {
                        feature,
                        expected: entry.intervention.clone(),
                        found: found.to_owned(),
                    })
                }
                _ => Ok(entry),
            }
        })
        .collect()
}

/// Sorted distinct `intervention` identifiers of resolved entries.
pub fn distinct_interventions(entries: &[&InterventionType]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.intervention.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
