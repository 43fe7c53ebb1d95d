//! Multi-key fallback for renamed fields.
//!
//! Keys are listed newest first. The first key that is *present* decides the
//! result, even when its value cannot be read; older keys are consulted only
//! when every newer key is absent. Values from different keys are never
//! combined.

use crate::record::Fields;

/// Read the first present key among `keys` with `read`.
pub fn first_present<'a, T>(
    fields: &Fields<'a>,
    keys: &[&str],
    read: impl Fn(&Fields<'a>, &str) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .find(|key| fields.has(key))
        .and_then(|key| read(fields, key))
}

/// String flavour of [`first_present`].
#[must_use]
pub fn first_str<'a>(fields: &Fields<'a>, keys: &[&str]) -> Option<&'a str> {
    first_present(fields, keys, |f, key| f.str(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_key_used_when_newer_absent() {
        let v = json!({"Government": "$government_Democracy;"});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(
            first_str(&f, &["StationGovernment", "Government"]),
            Some("$government_Democracy;")
        );
    }

    #[test]
    fn newer_key_wins_when_both_present() {
        let v = json!({"StationGovernment": "new", "Government": "old"});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(first_str(&f, &["StationGovernment", "Government"]), Some("new"));
    }

    #[test]
    fn unreadable_newer_key_does_not_fall_back() {
        let v = json!({"StationGovernment": 12, "Government": "old"});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(first_str(&f, &["StationGovernment", "Government"]), None);
    }

    #[test]
    fn null_counts_as_absent() {
        let v = json!({"StationGovernment": null, "Government": "old"});
        let f = Fields::new(v.as_object().expect("object"));
        assert_eq!(first_str(&f, &["StationGovernment", "Government"]), Some("old"));
    }

    #[test]
    fn whole_object_taken_from_one_key() {
        let v = json!({"StationFaction": {"Name": "A"}, "Faction": "B", "FactionState": "Boom"});
        let f = Fields::new(v.as_object().expect("object"));
        let picked = first_present(&f, &["StationFaction", "Faction"], |f, key| {
            f.object(key)
                .map(|o| (o.string("Name"), o.string("FactionState")))
                .or_else(|| f.str(key).map(|s| (Some(s.to_string()), f.string("FactionState"))))
        });
        assert_eq!(picked, Some((Some("A".to_string()), None)));
    }
}
