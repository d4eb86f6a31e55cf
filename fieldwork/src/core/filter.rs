//! Field scoping for middleware entries.

use crate::middleware::MiddlewareEntry;

/// True if `entry` applies to writes of `field`.
///
/// An entry with an `only` set applies exclusively to those fields; an entry
/// with an `except` set is suppressed for those fields. Exclusion wins when a
/// field appears in both sets. An entry declaring neither set always applies.
pub fn applies(entry: &MiddlewareEntry, field: &str) -> bool {
    if let Some(only) = &entry.only
        && !only.contains(field)
    {
        return false;
    }
    if let Some(except) = &entry.except
        && except.contains(field)
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{MiddlewareEntry, Outcome};

    fn entry() -> MiddlewareEntry {
        MiddlewareEntry::sync("noop", |_, _, _| Ok(Outcome::Unchanged))
    }

    /// Entries declaring neither set apply to every field.
    #[test]
    fn unscoped_entry_always_applies() {
        assert!(applies(&entry(), "anything"));
    }

    /// `only` restricts the entry to the listed fields.
    #[test]
    fn only_restricts_to_listed_fields() {
        let entry = entry().only(["name"]);
        assert!(applies(&entry, "name"));
        assert!(!applies(&entry, "age"));
    }

    /// `except` suppresses the entry for the listed fields.
    #[test]
    fn except_suppresses_listed_fields() {
        let entry = entry().except(["age"]);
        assert!(applies(&entry, "name"));
        assert!(!applies(&entry, "age"));
    }

    /// A field listed in both `only` and `except` never runs.
    #[test]
    fn exclusion_wins_when_field_in_both_sets() {
        let entry = entry().only(["name", "age"]).except(["name"]);
        assert!(!applies(&entry, "name"));
        assert!(applies(&entry, "age"));
    }
}
