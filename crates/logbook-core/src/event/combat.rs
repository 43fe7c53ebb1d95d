//! Combat payloads.

use serde::Serialize;

use crate::normalize::{Localised, NameTables, first_present, localised};
use crate::record::{FieldError, Fields};

/// Payload of `ShipTargeted`.
///
/// The scanner reports progressively: stage 0 is the bare lock, stage 1
/// adds the pilot, stage 2 adds health and stage 3 adds faction, legal
/// status and subsystem. Later stages repeat everything earlier ones said.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipTargetedData {
    pub target_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_stage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot_name: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot_rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield_health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull_health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<Localised>,
}

impl ShipTargetedData {
    /// # Errors
    ///
    /// [`FieldError`] when `TargetLocked` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            target_locked: f.bool_req("TargetLocked")?,
            scan_stage: f.i64("ScanStage"),
            ship: localised(f, "Ship", tables),
            pilot_name: localised(f, "PilotName", tables),
            pilot_rank: f.string("PilotRank"),
            shield_health: f.f64("ShieldHealth"),
            hull_health: f.f64("HullHealth"),
            faction: f.non_empty_str("Faction").map(str::to_string),
            legal_status: f.string("LegalStatus"),
            bounty: f.i64("Bounty"),
            subsystem: localised(f, "Subsystem", tables),
        })
    }
}

/// Payload of `UnderAttack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnderAttackData {
    /// `You`, `Fighter`, `Mothership` or absent on old clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl UnderAttackData {
    /// # Errors
    ///
    /// Never fails.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            target: f.non_empty_str("Target").map(str::to_string),
        })
    }

    /// The attacked party, `You` when unspecified.
    #[must_use]
    pub fn target_or_player(&self) -> &str {
        self.target.as_deref().unwrap_or("You")
    }
}

/// One member of a wing that destroyed the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Killer {
    pub name: Localised,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

impl Killer {
    /// `keys` are the name, ship and rank keys.
    fn decode(f: &Fields<'_>, keys: [&str; 3], tables: &NameTables) -> Option<Self> {
        let [name, ship, rank] = keys;
        Some(Self {
            name: localised(f, name, tables)?,
            ship: localised(f, ship, tables),
            rank: f.string(rank),
        })
    }
}

/// Payload of `Died`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiedData {
    /// Single killer (`KillerName`) or wing (`Killers`). Empty for
    /// self-inflicted or environmental deaths.
    pub killers: Vec<Killer>,
}

impl DiedData {
    /// # Errors
    ///
    /// Never fails.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let killers = f
            .objects("Killers", |k| {
                Killer::decode(&k, ["Name", "Ship", "Rank"], tables)
                    .ok_or_else(|| FieldError::missing("Name"))
            })
            .or_else(|| {
                Killer::decode(f, ["KillerName", "KillerShip", "KillerRank"], tables)
                    .map(|k| vec![k])
            })
            .unwrap_or_default();
        Ok(Self { killers })
    }
}

/// Reward from one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionReward {
    pub faction: String,
    pub reward: i64,
}

/// Payload of `Bounty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BountyData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim_faction: Option<Localised>,
    pub total_reward: i64,
    pub rewards: Vec<FactionReward>,
    pub shared_with_others: bool,
}

impl BountyData {
    /// # Errors
    ///
    /// Never fails.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let rewards: Vec<FactionReward> = f
            .objects("Rewards", |r| {
                Ok(FactionReward {
                    faction: r.string_req("Faction")?,
                    reward: r.i64_or("Reward", 0),
                })
            })
            .unwrap_or_default();
        // Skimmer bounties carry a single `Reward` instead of `TotalReward`.
        let total_reward = first_present(f, &["TotalReward", "Reward"], |f, key| f.i64(key))
            .unwrap_or_else(|| rewards.iter().map(|r| r.reward).sum());
        Ok(Self {
            target: localised(f, "Target", tables),
            victim_faction: localised(f, "VictimFaction", tables),
            total_reward,
            rewards,
            shared_with_others: f.bool_or("SharedWithOthers", false),
        })
    }
}
