//! Ability identifier compilation.
//!
//! A check request is matched against stored abilities through a compiled
//! set of candidate identifiers. The set always carries the applicable
//! wildcard tiers, and every identifier is lowercased; matching is
//! case-insensitive throughout.

use warden_types::Target;

/// Compile the ordered candidate identifiers for an `(ability, target)`
/// pair.
///
/// - no target: `[ability, "*-*", "*"]`
/// - the `"*"` type wildcard: `["{ability}-*", "*-*"]`
/// - an entity target: `["{ability}-{type}", "{ability}-*", "*-{type}",
///   "*-*"]`, plus `["{ability}-{type}-{id}", "*-{type}-{id}"]` when the
///   entity is persisted.
///
/// Order is insertion order; matching checks set membership, so the order
/// only keeps listings deterministic.
pub fn compile_identifiers(ability: &str, target: Option<&Target>) -> Vec<String> {
    let identifiers = match target {
        None => vec![ability.to_string(), "*-*".to_string(), "*".to_string()],
        Some(Target::All) => vec![format!("{ability}-*"), "*-*".to_string()],
        Some(Target::Entity(entity)) => {
            let entity_type = &entity.kind;

            let mut identifiers = vec![
                format!("{ability}-{entity_type}"),
                format!("{ability}-*"),
                format!("*-{entity_type}"),
                "*-*".to_string(),
            ];

            if let Some(id) = entity.id {
                identifiers.push(format!("{ability}-{entity_type}-{id}"));
                identifiers.push(format!("*-{entity_type}-{id}"));
            }

            identifiers
        }
    };

    identifiers.into_iter().map(|identifier| identifier.to_lowercase()).collect()
}
