//! Attribute-level three-way merge of a single feature.
//!
//! When both sides of a merge modify the same feature to different content,
//! the whole-object comparison alone would force a conflict. Comparing
//! attribute by attribute against the base version salvages the common case
//! where the two sides edited different fields of the same record.

use strata_store::Feature;

/// Result of attempting an attribute-level merge.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureMergeOutcome {
    /// Every attribute merged cleanly; the combined feature is returned.
    Merged(Feature),
    /// At least one attribute was changed to different values on both sides,
    /// or the two versions are not comparable. The path must be reported as
    /// a full-object conflict.
    Conflict,
}

/// Three-way merge of `ours` and `theirs` against their common `base`.
///
/// Per attribute: a side that left the base value alone yields to the side
/// that changed it; identical changes on both sides are taken as-is; changes
/// to different values on both sides fail the whole merge. Features of
/// different types (or with mismatched attribute counts) are never merged
/// attribute-wise.
pub fn merge_features(base: &Feature, ours: &Feature, theirs: &Feature) -> FeatureMergeOutcome {
    if ours.feature_type != theirs.feature_type
        || base.feature_type != ours.feature_type
        || base.values.len() != ours.values.len()
        || base.values.len() != theirs.values.len()
    {
        return FeatureMergeOutcome::Conflict;
    }

    let mut merged = Vec::with_capacity(base.values.len());
    for (index, base_value) in base.values.iter().enumerate() {
        let our_value = &ours.values[index];
        let their_value = &theirs.values[index];

        if our_value == their_value {
            merged.push(our_value.clone());
        } else if our_value == base_value {
            merged.push(their_value.clone());
        } else if their_value == base_value {
            merged.push(our_value.clone());
        } else {
            return FeatureMergeOutcome::Conflict;
        }
    }

    FeatureMergeOutcome::Merged(Feature::new(ours.feature_type, merged))
}
