//! Travel payloads: jumps, docking and planetary landings.
//!
//! Station and system descriptions went through two rounds of key renames.
//! Current records use `Station*`/`System*` prefixed keys and a
//! `StationFaction`/`SystemFaction` object; older ones used un-prefixed keys
//! and a bare faction name next to a `FactionState`. [`StationInfo`] and
//! [`SystemInfo`] resolve both shapes through [`first_present`], so the
//! newest present key always wins and values are never mixed across keys.

use serde::Serialize;

use crate::normalize::{Localised, NameTables, first_present, first_str, localised, localised_first};
use crate::record::{FieldError, Fields};

/// Galactic coordinates from a `StarPos` triple.
#[must_use]
pub fn star_pos(f: &Fields<'_>) -> Option<[f64; 3]> {
    let coords = f.value("StarPos")?.as_array()?;
    match coords.as_slice() {
        [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
        _ => None,
    }
}

/// Keys newest first; `legacy` decides whether the older key is consulted.
fn keys<'k>(pair: &'k [&'k str; 2], legacy: bool) -> &'k [&'k str] {
    if legacy { &pair[..] } else { &pair[..1] }
}

/// A faction with its state at the time of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Object form `{"Name":…,"FactionState":…}` or a bare name with a sibling
/// `FactionState`, whichever the first present key holds.
fn faction(f: &Fields<'_>, keys: &[&str]) -> Option<FactionRef> {
    first_present(f, keys, |f, key| {
        if let Some(obj) = f.object(key) {
            return obj.string("Name").map(|name| FactionRef {
                name,
                state: obj.string("FactionState"),
            });
        }
        f.string(key).map(|name| FactionRef {
            name,
            state: f.string("FactionState"),
        })
    })
}

// ---------------------------------------------------------------------------
// Station / system descriptions
// ---------------------------------------------------------------------------

/// One entry of `StationEconomies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomyShare {
    pub economy: Localised,
    pub proportion: f64,
}

/// Station description shared by `Docked` and `Location`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<FactionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allegiance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub government: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub economy: Option<Localised>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub economies: Vec<EconomyShare>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

impl StationInfo {
    /// Decode station fields. With `legacy`, un-prefixed keys from older
    /// `Docked` records are used when the `Station*` key is absent.
    #[must_use]
    pub fn decode(f: &Fields<'_>, tables: &NameTables, legacy: bool) -> Self {
        Self {
            station_type: f.non_empty_str("StationType").map(str::to_string),
            market_id: f.i64("MarketID"),
            faction: faction(f, keys(&["StationFaction", "Faction"], legacy)),
            allegiance: first_str(f, keys(&["StationAllegiance", "Allegiance"], legacy))
                .map(str::to_string),
            government: localised_first(
                f,
                keys(&["StationGovernment", "Government"], legacy),
                tables,
            ),
            economy: localised_first(f, keys(&["StationEconomy", "Economy"], legacy), tables),
            economies: f
                .objects("StationEconomies", |e| {
                    Ok(EconomyShare {
                        economy: localised(&e, "Name", tables)
                            .ok_or_else(|| FieldError::missing("Name"))?,
                        proportion: e.f64_or("Proportion", 0.0),
                    })
                })
                .unwrap_or_default(),
            services: f.strings("StationServices"),
        }
    }
}

/// System description shared by `Location` and `FSDJump`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_pos: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allegiance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub economy: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_economy: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub government: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controlling_faction: Option<FactionRef>,
}

impl SystemInfo {
    /// Decode system fields, falling back to the un-prefixed keys that
    /// jump and location records used before the `System*` prefix.
    #[must_use]
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Self {
        Self {
            system_address: f.i64("SystemAddress"),
            star_pos: star_pos(f),
            allegiance: first_str(f, &["SystemAllegiance", "Allegiance"]).map(str::to_string),
            economy: localised_first(f, &["SystemEconomy", "Economy"], tables),
            second_economy: localised(f, "SystemSecondEconomy", tables),
            government: localised_first(f, &["SystemGovernment", "Government"], tables),
            security: localised_first(f, &["SystemSecurity", "Security"], tables),
            population: f.i64("Population"),
            controlling_faction: faction(f, &["SystemFaction", "Faction"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of `Location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationData {
    pub star_system: String,
    #[serde(flatten)]
    pub system: SystemInfo,
    pub docked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<StationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
}

impl LocationData {
    /// # Errors
    ///
    /// [`FieldError`] when `StarSystem` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let station_name = f.non_empty_str("StationName").map(str::to_string);
        // Un-prefixed keys here describe the system, never the station.
        let station = station_name
            .as_ref()
            .map(|_| StationInfo::decode(f, tables, false));
        Ok(Self {
            star_system: f.string_req("StarSystem")?,
            system: SystemInfo::decode(f, tables),
            docked: f.bool_or("Docked", false),
            station_name,
            station,
            body: f.non_empty_str("Body").map(str::to_string),
            body_type: f.non_empty_str("BodyType").map(str::to_string),
        })
    }
}

/// Payload of `FSDJump`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FsdJumpData {
    pub star_system: String,
    #[serde(flatten)]
    pub system: SystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub jump_dist: f64,
    pub fuel_used: f64,
    pub fuel_level: f64,
    pub boost_used: i64,
}

impl FsdJumpData {
    /// # Errors
    ///
    /// [`FieldError`] when `StarSystem` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            star_system: f.string_req("StarSystem")?,
            system: SystemInfo::decode(f, tables),
            body: f.non_empty_str("Body").map(str::to_string),
            jump_dist: f.f64_or("JumpDist", 0.0),
            fuel_used: f.f64_or("FuelUsed", 0.0),
            fuel_level: f.f64_or("FuelLevel", 0.0),
            boost_used: f.i64_or("BoostUsed", 0),
        })
    }
}

/// Payload of `FSDTarget`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsdTargetData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_jumps_in_route: Option<i64>,
}

impl FsdTargetData {
    /// # Errors
    ///
    /// [`FieldError`] when `Name` is missing.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            name: f.string_req("Name")?,
            system_address: f.i64("SystemAddress"),
            star_class: f.string("StarClass"),
            remaining_jumps_in_route: f.i64("RemainingJumpsInRoute"),
        })
    }
}

/// Payload of `Docked`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DockedData {
    pub station_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    #[serde(flatten)]
    pub station: StationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_from_star_ls: Option<f64>,
    pub wanted: bool,
    pub active_fine: bool,
    pub cockpit_breach: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_pads: Option<LandingPads>,
}

/// Pad counts by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LandingPads {
    pub small: i64,
    pub medium: i64,
    pub large: i64,
}

impl DockedData {
    /// # Errors
    ///
    /// [`FieldError`] when `StationName` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            station_name: f.string_req("StationName")?,
            star_system: f.string("StarSystem"),
            system_address: f.i64("SystemAddress"),
            station: StationInfo::decode(f, tables, true),
            dist_from_star_ls: f.f64("DistFromStarLS"),
            wanted: f.bool_or("Wanted", false),
            active_fine: f.bool_or("ActiveFine", false),
            cockpit_breach: f.bool_or("CockpitBreach", false),
            landing_pads: f.object("LandingPads").map(|pads| LandingPads {
                small: pads.i64_or("Small", 0),
                medium: pads.i64_or("Medium", 0),
                large: pads.i64_or("Large", 0),
            }),
        })
    }
}

/// Payload of `Undocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndockedData {
    pub station_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<i64>,
}

impl UndockedData {
    /// # Errors
    ///
    /// [`FieldError`] when `StationName` is missing.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            station_name: f.string_req("StationName")?,
            station_type: f.non_empty_str("StationType").map(str::to_string),
            market_id: f.i64("MarketID"),
        })
    }
}

/// Payload of `Touchdown` and `Liftoff`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Settlement near the landing site. An empty value is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_destination: Option<Localised>,
    pub player_controlled: bool,
    pub on_station: bool,
    pub on_planet: bool,
}

impl SurfaceData {
    /// # Errors
    ///
    /// Never fails; every field is optional.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            star_system: f.string("StarSystem"),
            body: f.non_empty_str("Body").map(str::to_string),
            latitude: f.f64("Latitude"),
            longitude: f.f64("Longitude"),
            nearest_destination: f.non_empty_str("NearestDestination").map(|raw| {
                Localised::resolve(raw, f.str("NearestDestination_Localised"), tables)
            }),
            player_controlled: f.bool_or("PlayerControlled", true),
            on_station: f.bool_or("OnStation", false),
            on_planet: f.bool_or("OnPlanet", true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: &serde_json::Value) -> Fields<'_> {
        Fields::new(v.as_object().expect("object"))
    }

    #[test]
    fn docked_current_schema() {
        let v = json!({
            "StationName": "Jameson Memorial",
            "StationType": "Orbis",
            "MarketID": 128666762,
            "StationFaction": {"Name": "Pilots' Federation Local Branch", "FactionState": "None"},
            "StationGovernment": "$government_Democracy;",
            "StationGovernment_Localised": "Democracy",
            "StationEconomy": "$economy_HighTech;",
            "StationEconomy_Localised": "",
            "StationEconomies": [
                {"Name": "$economy_HighTech;", "Name_Localised": "High Tech", "Proportion": 0.8},
                {"Name": "$economy_Industrial;", "Proportion": 0.2},
                "garbage"
            ],
            "StationServices": ["dock", "refuel"],
            "LandingPads": {"Small": 4, "Medium": 8, "Large": 4}
        });
        let d = DockedData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        assert_eq!(d.station_name, "Jameson Memorial");
        assert_eq!(
            d.station.faction.as_ref().map(|fa| fa.name.as_str()),
            Some("Pilots' Federation Local Branch")
        );
        assert_eq!(d.station.economy.as_ref().map(|e| e.text.as_str()), Some("High Tech"));
        assert_eq!(d.station.economies.len(), 2);
        assert_eq!(d.station.economies[1].economy.text, "Industrial");
        assert_eq!(d.station.services, ["dock", "refuel"]);
        assert_eq!(d.landing_pads.map(|p| p.medium), Some(8));
    }

    #[test]
    fn docked_legacy_schema() {
        let v = json!({
            "StationName": "Abraham Lincoln",
            "Faction": "Federal Government",
            "FactionState": "Boom",
            "Government": "$government_Democracy;",
            "Economy": "$economy_Service;",
            "Allegiance": "Federation"
        });
        let d = DockedData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        let faction = d.station.faction.expect("faction");
        assert_eq!(faction.name, "Federal Government");
        assert_eq!(faction.state.as_deref(), Some("Boom"));
        assert_eq!(d.station.government.map(|g| g.text), Some("Democracy".into()));
        assert_eq!(d.station.allegiance.as_deref(), Some("Federation"));
    }

    #[test]
    fn docked_requires_station_name() {
        let v = json!({"StarSystem": "Sol"});
        let err = DockedData::decode(&fields(&v), &NameTables::builtin()).unwrap_err();
        assert_eq!(err.field(), "StationName");
    }

    #[test]
    fn location_ignores_legacy_station_keys() {
        let v = json!({
            "StarSystem": "Sol",
            "Docked": true,
            "StationName": "Abraham Lincoln",
            "Government": "$government_Democracy;",
            "Faction": "Mother Gaia",
            "StarPos": [0.0, 0.0, 0.0]
        });
        let loc = LocationData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        let station = loc.station.expect("station");
        assert!(station.government.is_none());
        assert!(station.faction.is_none());
        assert_eq!(
            loc.system.controlling_faction.map(|fa| fa.name),
            Some("Mother Gaia".into())
        );
        assert_eq!(loc.system.star_pos, Some([0.0, 0.0, 0.0]));
        assert!(loc.docked);
    }

    #[test]
    fn fsd_jump_system_faction_object() {
        let v = json!({
            "StarSystem": "Shinrarta Dezhra",
            "SystemFaction": {"Name": "Pilots' Federation Local Branch"},
            "SystemSecurity": "$SYSTEM_SECURITY_high;",
            "SystemSecurity_Localised": "",
            "JumpDist": 12.5
        });
        let j = FsdJumpData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        assert_eq!(
            j.system.security.map(|s| s.text),
            Some("High Security".into())
        );
        assert!((j.jump_dist - 12.5).abs() < f64::EPSILON);
        assert_eq!(j.system.controlling_faction.and_then(|f| f.state), None);
    }

    #[test]
    fn empty_nearest_destination_is_absent() {
        let v = json!({"Body": "Sol 3", "NearestDestination": "", "NearestDestination_Localised": ""});
        let s = SurfaceData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        assert!(s.nearest_destination.is_none());

        let v = json!({"NearestDestination": "$SAA_Unknown_Signal:#type=$SAA_SignalType_Geological;:#index=3;"});
        let s = SurfaceData::decode(&fields(&v), &NameTables::builtin()).expect("decode");
        assert!(s.nearest_destination.is_some_and(|d| !d.text.is_empty()));
    }

    #[test]
    fn star_pos_requires_three_numbers() {
        let v = json!({"StarPos": [1.0, 2.0]});
        assert_eq!(star_pos(&fields(&v)), None);
        let v = json!({"StarPos": [1, 2.5, -3]});
        assert_eq!(star_pos(&fields(&v)), Some([1.0, 2.5, -3.0]));
    }
}
