//! Exploration payloads: body scans, surface mapping and plotted routes.
//!
//! [`ScanData`] and [`NavRouteData`] carry a [`Derived`] slot. The scan value
//! depends on the mapped flags that a later `SAAScanComplete` sets, and the
//! route summary depends on the route a `NavRoute.json` sidecar supplies;
//! both inputs are only reachable through [`Derived::inputs_mut`].

use serde::Serialize;

use crate::completion::{Completable, CompletionBody, Rejection, SidecarKind, SidecarSnapshot};
use crate::derived::Derived;
use crate::normalize::{Localised, NameTables};
use crate::record::{FieldError, Fields};

use super::travel::star_pos;

// ---------------------------------------------------------------------------
// Scan value
// ---------------------------------------------------------------------------

/// Everything the value of a scanned body depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ScanValueInputs {
    /// Star class (`K`, `DA`, `N`…) for stars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_type: Option<String>,
    /// Planet class (`Earthlike body`…) for planets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planet_class: Option<String>,
    /// True when the body is or was terraformable.
    pub terraformable: bool,
    /// Solar masses for stars, Earth masses for planets.
    pub mass: f64,
    /// Someone else scanned it first.
    pub was_discovered: bool,
    /// Someone else mapped it first.
    pub was_mapped: bool,
    /// Mapped by this commander.
    pub mapped: bool,
    /// Mapped within the probe efficiency target.
    pub efficiently_mapped: bool,
}

/// Exploration value of one body, in credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimatedValue {
    /// Value when sold.
    pub credits: i64,
    /// The first-discovery bonus is included.
    pub first_discovery: bool,
    /// The mapping bonus is included.
    pub mapped: bool,
}

/// Black-box body valuation, injected by the caller.
pub trait ValueEstimator: Send + Sync {
    /// Value of a body with these inputs.
    fn estimate(&self, inputs: &ScanValueInputs) -> EstimatedValue;
}

/// Community base-value tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseValueEstimator;

const MASS_FACTOR: f64 = 0.565_918_28;
const MAPPED_MULTIPLIER: f64 = 3.333_333_3;
const EFFICIENCY_BONUS: f64 = 1.25;
const FIRST_DISCOVERY_MULTIPLIER: f64 = 2.6;
const MINIMUM_PLANET_VALUE: f64 = 500.0;

impl BaseValueEstimator {
    fn star_value(star_type: &str, mass: f64) -> f64 {
        let k = match star_type {
            "N" | "H" | "SupermassiveBlackHole" => 22_628.0,
            t if t.starts_with('D') => 14_057.0,
            _ => 1_200.0,
        };
        k + mass * k / 66.25
    }

    fn planet_value(inputs: &ScanValueInputs, class: &str) -> f64 {
        let class = class.to_ascii_lowercase();
        let (base, terraform_bonus) = match class.as_str() {
            "metal rich body" => (21_790.0, 0.0),
            "ammonia world" => (96_932.0, 0.0),
            "sudarsky class i gas giant" => (1_656.0, 0.0),
            "high metal content body" | "sudarsky class ii gas giant" => (9_654.0, 100_677.0),
            "earthlike body" => (64_831.0 + 116_295.0, 0.0),
            "water world" => (64_831.0, 116_295.0),
            _ => (300.0, 93_328.0),
        };
        let k = if inputs.terraformable {
            base + terraform_bonus
        } else {
            base
        };
        let mut value = k + k * MASS_FACTOR * inputs.mass.max(0.0).powf(0.2);
        if inputs.mapped {
            value *= MAPPED_MULTIPLIER;
            if inputs.efficiently_mapped {
                value *= EFFICIENCY_BONUS;
            }
        }
        value.max(MINIMUM_PLANET_VALUE)
    }
}

impl ValueEstimator for BaseValueEstimator {
    #[allow(clippy::cast_possible_truncation)]
    fn estimate(&self, inputs: &ScanValueInputs) -> EstimatedValue {
        let mut value = match (&inputs.star_type, &inputs.planet_class) {
            (Some(star), _) => Self::star_value(star, inputs.mass),
            (None, Some(class)) => Self::planet_value(inputs, class),
            (None, None) => 0.0,
        };
        let first_discovery = !inputs.was_discovered && value > 0.0;
        if first_discovery {
            value *= FIRST_DISCOVERY_MULTIPLIER;
        }
        EstimatedValue {
            credits: value.round() as i64,
            first_discovery,
            mapped: inputs.mapped && inputs.star_type.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Payload of `Scan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanData {
    pub body_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_arrival_ls: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volcanism: Option<Localised>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landable: Option<bool>,
    #[serde(flatten)]
    value: Derived<ScanValueInputs, EstimatedValue>,
}

impl ScanData {
    /// # Errors
    ///
    /// [`FieldError`] when `BodyName` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let star_type = f.string("StarType");
        let terraform_state = f.non_empty_str("TerraformState").map(str::to_string);
        let mass = if star_type.is_some() {
            f.f64_or("StellarMass", 0.0)
        } else {
            f.f64_or("MassEM", 0.0)
        };
        let inputs = ScanValueInputs {
            star_type,
            planet_class: f.non_empty_str("PlanetClass").map(str::to_string),
            terraformable: terraform_state.is_some(),
            mass,
            // Scans written before discovery tracking carry no flags; assume
            // someone got there first.
            was_discovered: f.bool_or("WasDiscovered", true),
            was_mapped: f.bool_or("WasMapped", true),
            mapped: false,
            efficiently_mapped: false,
        };
        Ok(Self {
            body_name: f.string_req("BodyName")?,
            body_id: f.i64("BodyID"),
            star_system: f.string("StarSystem"),
            system_address: f.i64("SystemAddress"),
            scan_type: f.string("ScanType"),
            distance_from_arrival_ls: f.f64("DistanceFromArrivalLS"),
            terraform_state,
            atmosphere: f
                .non_empty_str("Atmosphere")
                .map(|raw| Localised::resolve(raw, f.str("Atmosphere_Localised"), tables)),
            volcanism: f
                .non_empty_str("Volcanism")
                .map(|raw| Localised::resolve(raw, f.str("Volcanism_Localised"), tables)),
            landable: f.bool("Landable"),
            value: Derived::new(inputs),
        })
    }

    /// Inputs of the value estimate.
    #[must_use]
    pub const fn value_inputs(&self) -> &ScanValueInputs {
        self.value.inputs()
    }

    /// Estimated value, computed once per input state.
    pub fn estimated_value(&self, estimator: &dyn ValueEstimator) -> &EstimatedValue {
        self.value.get_or_compute(|inputs| estimator.estimate(inputs))
    }

    /// True when the body is a star.
    #[must_use]
    pub const fn is_star(&self) -> bool {
        self.value.inputs().star_type.is_some()
    }

    /// Record that this commander mapped the body. Returns `true` when that
    /// changed the value inputs.
    pub fn mark_mapped(&mut self, efficient: bool) -> bool {
        let current = self.value.inputs();
        if current.mapped && current.efficiently_mapped == efficient {
            return false;
        }
        let inputs = self.value.inputs_mut();
        inputs.mapped = true;
        inputs.efficiently_mapped = efficient;
        true
    }
}

/// Payload of `SAAScanComplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaaScanCompleteData {
    pub body_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    pub probes_used: i64,
    pub efficiency_target: i64,
}

impl SaaScanCompleteData {
    /// # Errors
    ///
    /// [`FieldError`] when `BodyName` is missing.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            body_name: f.string_req("BodyName")?,
            body_id: f.i64("BodyID"),
            system_address: f.i64("SystemAddress"),
            probes_used: f.i64_or("ProbesUsed", 0),
            efficiency_target: f.i64_or("EfficiencyTarget", 0),
        })
    }

    /// Mapped with no more probes than the target.
    #[must_use]
    pub const fn is_efficient(&self) -> bool {
        self.efficiency_target > 0 && self.probes_used <= self.efficiency_target
    }
}

// ---------------------------------------------------------------------------
// NavRoute
// ---------------------------------------------------------------------------

/// One system on a plotted route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub star_system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_address: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_pos: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_class: Option<String>,
}

impl RouteEntry {
    /// # Errors
    ///
    /// [`FieldError`] when `StarSystem` is missing.
    pub fn decode(f: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            star_system: f.string_req("StarSystem")?,
            system_address: f.i64("SystemAddress"),
            star_pos: star_pos(f),
            star_class: f.string("StarClass"),
        })
    }

    /// Fuel-scoopable main-sequence classes.
    #[must_use]
    pub fn is_scoopable(&self) -> bool {
        self.star_class
            .as_deref()
            .and_then(|class| class.chars().next())
            .is_some_and(|c| "KGBFOAM".contains(c))
    }
}

/// Summary of a plotted route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Jumps to the destination; the first entry is the current system.
    pub jumps: usize,
    /// Straight-line distance summed over each jump.
    pub total_distance_ly: f64,
    /// Jump targets a fuel scoop works on.
    pub scoopable_stars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl RouteSummary {
    /// Summarize route entries in travel order.
    #[must_use]
    pub fn of(entries: &[RouteEntry]) -> Self {
        let total_distance_ly = entries
            .windows(2)
            .filter_map(|pair| match (pair[0].star_pos, pair[1].star_pos) {
                (Some(a), Some(b)) => Some(distance(a, b)),
                _ => None,
            })
            .sum();
        Self {
            jumps: entries.len().saturating_sub(1),
            total_distance_ly,
            scoopable_stars: entries.iter().skip(1).filter(|e| e.is_scoopable()).count(),
            destination: entries.last().map(|e| e.star_system.clone()),
        }
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
}

/// Payload of `NavRoute`. The route itself arrives in `NavRoute.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavRouteData {
    route: Derived<Option<CompletionBody<RouteEntry>>, RouteSummary>,
}

impl NavRouteData {
    /// Older clients wrote the route inline; current ones never do.
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible for the decode table.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        let inline = f
            .objects("Route", |entry| RouteEntry::decode(&entry))
            .map(CompletionBody::from_primary);
        Ok(Self {
            route: Derived::new(inline),
        })
    }

    /// The route, once known.
    #[must_use]
    pub const fn route(&self) -> Option<&CompletionBody<RouteEntry>> {
        self.route.inputs().as_ref()
    }

    /// Route summary, or `None` while the route is unknown.
    pub fn summary(&self) -> Option<&RouteSummary> {
        self.route.inputs().as_ref()?;
        Some(self.route.get_or_compute(|route| {
            route
                .as_ref()
                .map_or_else(|| RouteSummary::of(&[]), |body| RouteSummary::of(&body.entries))
        }))
    }
}

impl Completable for NavRouteData {
    fn sidecar_kind(&self) -> SidecarKind {
        SidecarKind::NavRoute
    }

    fn needs_completion(&self) -> bool {
        self.route.inputs().is_none()
    }

    fn identity(&self) -> Option<i64> {
        None
    }

    fn body_digest(&self) -> Option<&str> {
        self.route.inputs().as_ref()?.digest.as_deref()
    }

    fn replace_body(
        &mut self,
        snapshot: &SidecarSnapshot,
        _tables: &NameTables,
    ) -> Result<(), Rejection> {
        let entries = snapshot
            .fields()
            .objects_req("Route", |entry| RouteEntry::decode(&entry))
            .map_err(|_| Rejection::MissingBody { field: "Route" })?;
        *self.route.inputs_mut() = Some(CompletionBody::from_sidecar(entries, snapshot));
        Ok(())
    }
}
