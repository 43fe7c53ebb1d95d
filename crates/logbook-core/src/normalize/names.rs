//! Identifier canonicalization and friendly-name lookup.
//!
//! Journal identifiers come in several historical spellings for the same
//! thing: `$Drones_Name;`, `drones`, `Drones`, and later `limpet`. Replaying
//! an old record must produce the same canonical id as a current one, so
//! every id goes through [`canonical_id`] and then the [`IdentifierRemap`]
//! before any table lookup.

use std::collections::HashMap;

/// Source of friendly names keyed by canonical id.
pub trait FriendlyNames: Send + Sync {
    /// Friendly name for a canonical id, if known.
    fn friendly(&self, canonical_id: &str) -> Option<&str>;
}

/// Strip the `$…;` wrapper and a trailing `_name`, then lowercase.
#[must_use]
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let inner = inner.strip_suffix(';').unwrap_or(inner);
    let lower = inner.to_ascii_lowercase();
    match lower.strip_suffix("_name") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}

/// Derive a readable name from the identifier itself.
///
/// `$economy_HighTech;` becomes `High Tech`, `$SYSTEM_SECURITY_medium;`
/// becomes `Medium`, `Federation_Dropship_MkII` becomes
/// `Federation Dropship Mk II`. Falls back to the trimmed input when nothing
/// readable remains.
#[must_use]
pub fn derive_friendly(raw: &str) -> String {
    let trimmed = raw.trim();
    let symbolic = trimmed.starts_with('$');
    let inner = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let inner = inner.strip_suffix(';').unwrap_or(inner);

    let mut parts: Vec<&str> = inner.split('_').filter(|p| !p.is_empty()).collect();
    if parts.len() > 1
        && parts
            .last()
            .is_some_and(|last| last.eq_ignore_ascii_case("name"))
    {
        parts.pop();
    }
    // `$category_Value;` symbols carry their category as a prefix.
    if symbolic && parts.len() > 1 {
        parts.drain(..parts.len() - 1);
    }

    let words: Vec<String> = parts.iter().map(|p| split_camel(p)).collect();
    let joined = words.join(" ");
    if joined.is_empty() {
        return trimmed.to_string();
    }
    capitalize(&joined)
}

fn split_camel(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 4);
    let mut prev: Option<char> = None;
    for c in word.chars() {
        let boundary = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
        if boundary && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

// ---------------------------------------------------------------------------
// IdentifierRemap
// ---------------------------------------------------------------------------

/// Legacy canonical id → current canonical id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierRemap {
    entries: HashMap<String, String>,
}

impl IdentifierRemap {
    /// Renames shipped by the game over its lifetime.
    #[must_use]
    pub fn builtin() -> Self {
        let mut remap = Self::default();
        for (legacy, current) in [
            ("drones", "limpet"),
            ("terrainenrichmentsystems", "landenrichmentsystems"),
            ("comercialsamples", "commercialsamples"),
            ("agriculturalmedicines", "agronomictreatment"),
            ("cobra_mkiii", "cobramkiii"),
            ("viper_mkiii", "viper"),
        ] {
            remap.insert(legacy, current);
        }
        remap
    }

    /// Add or replace a mapping. Both sides are canonicalized.
    pub fn insert(&mut self, legacy: &str, current: &str) {
        self.entries
            .insert(canonical_id(legacy), canonical_id(current));
    }

    /// Map a canonical id to its current spelling.
    #[must_use]
    pub fn apply(&self, id: String) -> String {
        match self.entries.get(&id) {
            Some(current) => current.clone(),
            None => id,
        }
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// NameTable
// ---------------------------------------------------------------------------

/// In-memory friendly-name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    entries: HashMap<String, String>,
}

impl NameTable {
    /// Built-in names for economies, governments, security levels, ships and
    /// a handful of commodities whose derived names read poorly.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (id, text) in BUILTIN_NAMES {
            table.insert(id, text);
        }
        table
    }

    /// Add or replace a name. The id must already be canonical.
    pub fn insert(&mut self, canonical_id: &str, text: &str) {
        self.entries
            .insert(canonical_id.to_string(), text.to_string());
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FriendlyNames for NameTable {
    fn friendly(&self, canonical_id: &str) -> Option<&str> {
        self.entries.get(canonical_id).map(String::as_str)
    }
}

const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("economy_agri", "Agriculture"),
    ("economy_extraction", "Extraction"),
    ("economy_hightech", "High Tech"),
    ("economy_industrial", "Industrial"),
    ("economy_military", "Military"),
    ("economy_refinery", "Refinery"),
    ("economy_service", "Service"),
    ("economy_terraforming", "Terraforming"),
    ("economy_tourism", "Tourism"),
    ("economy_colony", "Colony"),
    ("economy_carrier", "Private Enterprise"),
    ("economy_prison", "Prison"),
    ("economy_rescue", "Rescue"),
    ("economy_repair", "Repair"),
    ("economy_damaged", "Damaged"),
    ("economy_none", "None"),
    ("government_anarchy", "Anarchy"),
    ("government_communism", "Communism"),
    ("government_confederacy", "Confederacy"),
    ("government_cooperative", "Cooperative"),
    ("government_corporate", "Corporate"),
    ("government_democracy", "Democracy"),
    ("government_dictatorship", "Dictatorship"),
    ("government_feudal", "Feudal"),
    ("government_patronage", "Patronage"),
    ("government_prisoncolony", "Prison Colony"),
    ("government_theocracy", "Theocracy"),
    ("government_carrier", "Private Ownership"),
    ("government_engineer", "Engineer"),
    ("government_none", "None"),
    ("system_security_low", "Low Security"),
    ("system_security_medium", "Medium Security"),
    ("system_security_high", "High Security"),
    ("galaxy_map_info_state_anarchy", "Anarchy"),
    ("galaxy_map_info_state_lawless", "Lawless"),
    ("sidewinder", "Sidewinder"),
    ("eagle", "Eagle"),
    ("hauler", "Hauler"),
    ("adder", "Adder"),
    ("viper", "Viper Mk III"),
    ("viper_mkiv", "Viper Mk IV"),
    ("cobramkiii", "Cobra Mk III"),
    ("cobramkiv", "Cobra Mk IV"),
    ("type6", "Type-6 Transporter"),
    ("type7", "Type-7 Transporter"),
    ("type9", "Type-9 Heavy"),
    ("type9_military", "Type-10 Defender"),
    ("asp", "Asp Explorer"),
    ("asp_scout", "Asp Scout"),
    ("vulture", "Vulture"),
    ("python", "Python"),
    ("anaconda", "Anaconda"),
    ("krait_mkii", "Krait Mk II"),
    ("krait_light", "Krait Phantom"),
    ("diamondbackxl", "Diamondback Explorer"),
    ("federation_dropship", "Federal Dropship"),
    ("federation_dropship_mkii", "Federal Assault Ship"),
    ("federation_gunship", "Federal Gunship"),
    ("federation_corvette", "Federal Corvette"),
    ("empire_courier", "Imperial Courier"),
    ("empire_trader", "Imperial Clipper"),
    ("empire_eagle", "Imperial Eagle"),
    ("cutter", "Imperial Cutter"),
    ("ferdelance", "Fer-de-Lance"),
    ("typex", "Alliance Chieftain"),
    ("mamba", "Mamba"),
    ("limpet", "Limpet"),
    ("landenrichmentsystems", "Land Enrichment Systems"),
    ("agronomictreatment", "Agronomic Treatment"),
    ("commercialsamples", "Commercial Samples"),
    ("lowtemperaturediamond", "Low Temperature Diamonds"),
    ("painite", "Painite"),
    ("gold", "Gold"),
];
