//! Session payloads: file header, commander and game load.

use serde::Serialize;

use crate::normalize::{Localised, NameTables, localised};
use crate::record::{FieldError, Fields};

/// Payload of `Fileheader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileheaderData {
    pub part: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odyssey: Option<bool>,
}

impl FileheaderData {
    /// # Errors
    ///
    /// Never fails; every field is optional.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            part: f.i64_or("part", 1),
            language: f.string("language"),
            game_version: f.string("gameversion"),
            build: f.string("build").map(|b| b.trim().to_string()),
            odyssey: f.bool("Odyssey"),
        })
    }
}

/// Payload of `Commander`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommanderData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fid: Option<String>,
}

impl CommanderData {
    /// # Errors
    ///
    /// [`FieldError`] when `Name` is missing.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            name: f.string_req("Name")?,
            fid: f.string("FID"),
        })
    }
}

/// Payload of `LoadGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadGameData {
    pub commander: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_ident: Option<String>,
    pub credits: i64,
    pub loan: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub horizons: bool,
    pub odyssey: bool,
}

impl LoadGameData {
    /// # Errors
    ///
    /// [`FieldError`] when `Commander` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            commander: f.string_req("Commander")?,
            fid: f.string("FID"),
            ship: localised(f, "Ship", tables),
            ship_id: f.i64("ShipID"),
            ship_name: f.non_empty_str("ShipName").map(str::to_string),
            ship_ident: f.non_empty_str("ShipIdent").map(str::to_string),
            credits: f.i64_or("Credits", 0),
            loan: f.i64_or("Loan", 0),
            game_mode: f.string("GameMode"),
            group: f.non_empty_str("Group").map(str::to_string),
            horizons: f.bool_or("Horizons", false),
            odyssey: f.bool_or("Odyssey", false),
        })
    }
}
