//! Localized text with friendly-name fallback.
//!
//! Many fields come as an identifier plus an optional `<key>_Localised`
//! companion. A non-empty localized value is kept verbatim; otherwise the
//! friendly name of the identifier is substituted. Whenever the identifier
//! is present the resulting text is non-empty.

use serde::Serialize;

use super::NameTables;
use super::keys::first_present;
use crate::record::Fields;

/// A canonical identifier with its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Localised {
    /// Canonical, remapped identifier.
    pub id: String,
    /// Localized text, or the friendly name when none was supplied.
    pub text: String,
}

impl Localised {
    /// Build from a raw identifier and optional localized text.
    #[must_use]
    pub fn resolve(raw_id: &str, localised: Option<&str>, tables: &NameTables) -> Self {
        Self {
            id: tables.canonical(raw_id),
            text: localised_text(raw_id, localised, tables),
        }
    }
}

/// Display text for `raw_id`: the localized value, untouched, unless it is
/// blank; then the friendly name.
#[must_use]
pub fn localised_text(raw_id: &str, localised: Option<&str>, tables: &NameTables) -> String {
    match localised {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => tables.friendly_text(raw_id),
    }
}

/// Read `key` and `key_Localised` from `fields`.
#[must_use]
pub fn localised(fields: &Fields<'_>, key: &str, tables: &NameTables) -> Option<Localised> {
    let raw = fields.str(key)?;
    let loc = fields.str(&format!("{key}_Localised"));
    Some(Localised::resolve(raw, loc, tables))
}

/// Multi-key flavour of [`localised`]: the first present key wins, and its
/// own `_Localised` companion is the only one consulted.
#[must_use]
pub fn localised_first(
    fields: &Fields<'_>,
    keys: &[&str],
    tables: &NameTables,
) -> Option<Localised> {
    first_present(fields, keys, |f, key| localised(f, key, tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_localised_falls_back_to_friendly() {
        let tables = NameTables::builtin();
        let v = json!({"StationEconomy": "$economy_HighTech;", "StationEconomy_Localised": ""});
        let f = Fields::new(v.as_object().expect("object"));
        let loc = localised(&f, "StationEconomy", &tables).expect("present");
        assert_eq!(loc.id, "economy_hightech");
        assert_eq!(loc.text, "High Tech");
    }

    #[test]
    fn null_localised_falls_back_to_friendly() {
        let tables = NameTables::builtin();
        let v = json!({"Economy": "$economy_Agri;", "Economy_Localised": null});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(
            localised(&f, "Economy", &tables).map(|l| l.text),
            Some("Agriculture".to_string())
        );
    }

    #[test]
    fn non_empty_localised_kept_verbatim() {
        let tables = NameTables::builtin();
        let v = json!({"StationEconomy": "$economy_HighTech;", "StationEconomy_Localised": "Hochtechnologie"});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(
            localised(&f, "StationEconomy", &tables).map(|l| l.text),
            Some("Hochtechnologie".to_string())
        );
    }

    #[test]
    fn padded_localised_keeps_its_whitespace() {
        let tables = NameTables::builtin();
        let v = json!({"StationEconomy": "$economy_HighTech;", "StationEconomy_Localised": " Hochtech "});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(
            localised(&f, "StationEconomy", &tables).map(|l| l.text),
            Some(" Hochtech ".to_string())
        );
    }

    #[test]
    fn whitespace_only_localised_falls_back_to_friendly() {
        let tables = NameTables::builtin();
        assert_eq!(
            localised_text("$economy_HighTech;", Some("  \t"), &tables),
            "High Tech"
        );
    }

    #[test]
    fn absent_identifier_yields_none() {
        let tables = NameTables::builtin();
        let v = json!({"StationEconomy_Localised": "orphan"});
        let f = Fields::new(v.as_object().expect("object"));
        assert!(localised(&f, "StationEconomy", &tables).is_none());
    }

    #[test]
    fn multi_key_uses_companion_of_winning_key() {
        let tables = NameTables::builtin();
        let v = json!({
            "StationGovernment": "$government_Corporate;",
            "Government": "$government_Democracy;",
            "Government_Localised": "Democracy (old)"
        });
        let f = Fields::new(v.as_object().expect("object"));
        let loc = localised_first(&f, &["StationGovernment", "Government"], &tables)
            .expect("present");
        assert_eq!(loc.id, "government_corporate");
        assert_eq!(loc.text, "Corporate");
    }
}
