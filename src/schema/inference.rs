//! Column type inference and schema delta computation

use super::types::{ColumnSpec, ColumnType, KeyProfile, ObservedKeys, SchemaDelta, TableColumns};
use crate::types::{JsonValue, ValueKind};

/// Infer a column type from one sample value
///
/// Rules, first match wins:
/// 1. array or object → container
/// 2. string → text
/// 3. integer → integer, or 128-bit integer past the signed 64-bit range
/// 4. other number → float
/// 5. anything else, including no sample → container
pub fn infer_column_type(sample: Option<&JsonValue>) -> ColumnType {
    match sample.map(ValueKind::of) {
        Some(kind) if kind.is_container() => ColumnType::Json,
        Some(ValueKind::String) => ColumnType::Text,
        Some(ValueKind::Int) => ColumnType::Integer,
        Some(ValueKind::BigInt) => ColumnType::HugeInt,
        Some(ValueKind::Float) => ColumnType::Float,
        _ => ColumnType::Json,
    }
}

/// Infer a column type from everything the scan saw for a key
///
/// Uniform keys follow [`infer_column_type`] on the sample. Integers of
/// both widths widen to the 128-bit integer, integers mixed with floats
/// widen to float, and any other mix becomes a container.
pub fn infer_profile_type(profile: &KeyProfile) -> ColumnType {
    if profile.is_uniform() {
        return infer_column_type(Some(&profile.sample));
    }

    if only(profile, &[ValueKind::Int, ValueKind::BigInt]) {
        ColumnType::HugeInt
    } else if only(profile, &[ValueKind::Int, ValueKind::Float]) {
        ColumnType::Float
    } else {
        ColumnType::Json
    }
}

fn only(profile: &KeyProfile, allowed: &[ValueKind]) -> bool {
    profile.kinds.iter().all(|k| allowed.contains(k))
}

/// Columns to add: observed keys that are not existing columns
///
/// Keys equal up to ASCII case share one column, named by the first
/// spelling in sorted order and typed from their merged profiles.
pub fn compute_delta(observed: &ObservedKeys, existing: &TableColumns) -> SchemaDelta {
    SchemaDelta::new(
        observed
            .columns()
            .into_iter()
            .filter(|(key, _)| !existing.contains(key))
            .map(|(key, profile)| {
                let column_type = infer_profile_type(&profile);
                if !profile.is_uniform() {
                    tracing::debug!(
                        key,
                        kinds = ?profile.kinds,
                        occurrences = profile.occurrences,
                        column_type = %column_type,
                        "Mixed value kinds, widening"
                    );
                }
                ColumnSpec::new(key, column_type)
            }),
    )
}
