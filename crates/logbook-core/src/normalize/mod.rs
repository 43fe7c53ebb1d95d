//! Normalization rules for journal fields.
//!
//! The journal schema drifted across game releases: keys were renamed,
//! identifiers changed spelling, and localized companions (`X_Localised`)
//! come and go. The functions here reconcile that drift. All of them are
//! pure functions of their input plus a read-only [`NameTables`] handle that
//! the caller injects; nothing here reads global state.

pub mod keys;
pub mod names;
pub mod text;

pub use keys::{first_present, first_str};
pub use names::{FriendlyNames, IdentifierRemap, NameTable, canonical_id, derive_friendly};
pub use text::{Localised, localised, localised_first, localised_text};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Read-only lookup tables consulted during decode.
///
/// Cheap to clone; the friendly-name table is shared behind an [`Arc`].
#[derive(Clone)]
pub struct NameTables {
    remap: IdentifierRemap,
    names: Arc<dyn FriendlyNames>,
}

impl NameTables {
    /// Build tables from a remap table and any friendly-name source.
    #[must_use]
    pub fn new(remap: IdentifierRemap, names: Arc<dyn FriendlyNames>) -> Self {
        Self { remap, names }
    }

    /// The built-in remap and friendly-name tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(IdentifierRemap::builtin(), Arc::new(NameTable::builtin()))
    }

    /// Built-in tables with user overrides layered on top.
    #[must_use]
    pub fn with_overrides(
        friendly: &BTreeMap<String, String>,
        remap: &BTreeMap<String, String>,
    ) -> Self {
        let mut remaps = IdentifierRemap::builtin();
        for (legacy, current) in remap {
            remaps.insert(legacy, current);
        }
        // Lookups are keyed by the remapped id, so overrides must be too.
        let mut names = NameTable::builtin();
        for (id, text) in friendly {
            names.insert(&remaps.apply(canonical_id(id)), text);
        }
        Self::new(remaps, Arc::new(names))
    }

    /// Canonical form of a raw identifier, legacy spellings remapped.
    #[must_use]
    pub fn canonical(&self, raw: &str) -> String {
        self.remap.apply(canonical_id(raw))
    }

    /// Friendly name for a raw identifier. Never empty for a non-empty id.
    #[must_use]
    pub fn friendly_text(&self, raw: &str) -> String {
        let id = self.canonical(raw);
        match self.names.friendly(&id) {
            Some(text) => text.to_string(),
            None => derive_friendly(raw),
        }
    }

    /// The remap table.
    #[must_use]
    pub const fn remap(&self) -> &IdentifierRemap {
        &self.remap
    }
}

impl Default for NameTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for NameTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameTables")
            .field("remap", &self.remap)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_applies_remap_after_stripping() {
        let tables = NameTables::builtin();
        assert_eq!(tables.canonical("$Drones_Name;"), "limpet");
        assert_eq!(tables.canonical("Drones"), "limpet");
        assert_eq!(tables.canonical("Gold"), "gold");
    }

    #[test]
    fn friendly_prefers_table_then_derives() {
        let tables = NameTables::builtin();
        assert_eq!(tables.friendly_text("$economy_HighTech;"), "High Tech");
        assert_eq!(tables.friendly_text("$economy_Unheardof;"), "Unheardof");
        assert_eq!(tables.friendly_text("SomeNewThing"), "Some New Thing");
    }

    #[test]
    fn overrides_win_over_builtin() {
        let mut friendly = BTreeMap::new();
        friendly.insert("$economy_HighTech;".to_string(), "Hi-Tech".to_string());
        let mut remap = BTreeMap::new();
        remap.insert("oldgold".to_string(), "gold".to_string());
        let tables = NameTables::with_overrides(&friendly, &remap);
        assert_eq!(tables.friendly_text("$economy_HighTech;"), "Hi-Tech");
        assert_eq!(tables.canonical("OldGold"), "gold");
    }

    #[test]
    fn override_under_legacy_spelling_reaches_current_id() {
        let mut friendly = BTreeMap::new();
        friendly.insert("$Drones_Name;".to_string(), "Limpet Drone".to_string());
        let mut remap = BTreeMap::new();
        remap.insert("oldgold".to_string(), "gold".to_string());
        friendly.insert("OldGold".to_string(), "Shiny".to_string());
        let tables = NameTables::with_overrides(&friendly, &remap);
        assert_eq!(tables.friendly_text("limpet"), "Limpet Drone");
        assert_eq!(tables.friendly_text("$Drones_Name;"), "Limpet Drone");
        assert_eq!(tables.friendly_text("Gold"), "Shiny");
    }
}
