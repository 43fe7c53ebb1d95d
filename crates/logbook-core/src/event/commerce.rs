//! Station services whose listings arrive in sidecar files.
//!
//! `Market`, `Outfitting` and `Shipyard` records only identify the station.
//! The listing itself is written to `Market.json`, `Outfitting.json` or
//! `Shipyard.json`, which must carry the same `MarketID`. Reopening the
//! service rewrites the file, and each accepted rewrite replaces the whole
//! listing.

use serde::Serialize;

use crate::completion::{Completable, CompletionBody, Rejection, SidecarKind, SidecarSnapshot};
use crate::normalize::{Localised, NameTables, localised};
use crate::record::{FieldError, Fields};

/// Station identity shared by the three listing payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketHeader {
    pub market_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_system: Option<String>,
}

impl MarketHeader {
    fn decode(f: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            market_id: f.i64_req("MarketID")?,
            station_name: f.non_empty_str("StationName").map(str::to_string),
            station_type: f.non_empty_str("StationType").map(str::to_string),
            star_system: f.non_empty_str("StarSystem").map(str::to_string),
        })
    }

    /// Fill fields the primary record left out. Never overwrites.
    fn fill_from(&mut self, sidecar: &Fields<'_>) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = sidecar.non_empty_str(key).map(str::to_string);
            }
        };
        fill(&mut self.station_name, "StationName");
        fill(&mut self.station_type, "StationType");
        fill(&mut self.star_system, "StarSystem");
    }
}

/// Decode the listing under `key` from a sidecar and install it.
fn replace_listing<T>(
    header: &mut MarketHeader,
    body: &mut Option<CompletionBody<T>>,
    snapshot: &SidecarSnapshot,
    key: &'static str,
    decode: impl FnMut(Fields<'_>) -> Result<T, FieldError>,
) -> Result<(), Rejection> {
    let fields = snapshot.fields();
    let entries = fields
        .objects_req(key, decode)
        .map_err(|_| Rejection::MissingBody { field: key })?;
    *body = Some(CompletionBody::from_sidecar(entries, snapshot));
    header.fill_from(&fields);
    Ok(())
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// One commodity line of a market listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketItem {
    pub id: i64,
    pub commodity: Localised,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Localised>,
    pub buy_price: i64,
    pub sell_price: i64,
    pub mean_price: i64,
    pub stock: i64,
    pub stock_bracket: i64,
    pub demand: i64,
    pub demand_bracket: i64,
    pub consumer: bool,
    pub producer: bool,
    pub rare: bool,
}

impl MarketItem {
    /// # Errors
    ///
    /// [`FieldError`] when `Name` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            id: f.i64_or("id", 0),
            commodity: localised(f, "Name", tables).ok_or_else(|| FieldError::missing("Name"))?,
            category: localised(f, "Category", tables),
            buy_price: f.i64_or("BuyPrice", 0),
            sell_price: f.i64_or("SellPrice", 0),
            mean_price: f.i64_or("MeanPrice", 0),
            stock: f.i64_or("Stock", 0),
            // Brackets were written as "" instead of 0 by some clients.
            stock_bracket: f.i64_or("StockBracket", 0),
            demand: f.i64_or("Demand", 0),
            demand_bracket: f.i64_or("DemandBracket", 0),
            consumer: f.bool_or("Consumer", false),
            producer: f.bool_or("Producer", false),
            rare: f.bool_or("Rare", false),
        })
    }
}

/// Payload of `Market`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketData {
    #[serde(flatten)]
    pub header: MarketHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<CompletionBody<MarketItem>>,
}

impl MarketData {
    /// # Errors
    ///
    /// [`FieldError`] when `MarketID` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            header: MarketHeader::decode(f)?,
            items: f
                .objects("Items", |item| MarketItem::decode(&item, tables))
                .map(CompletionBody::from_primary),
        })
    }
}

impl Completable for MarketData {
    fn sidecar_kind(&self) -> SidecarKind {
        SidecarKind::Market
    }

    fn needs_completion(&self) -> bool {
        self.items.is_none()
    }

    fn identity(&self) -> Option<i64> {
        Some(self.header.market_id)
    }

    fn body_digest(&self) -> Option<&str> {
        self.items.as_ref()?.digest.as_deref()
    }

    fn replace_body(
        &mut self,
        snapshot: &SidecarSnapshot,
        tables: &NameTables,
    ) -> Result<(), Rejection> {
        replace_listing(&mut self.header, &mut self.items, snapshot, "Items", |item| {
            MarketItem::decode(&item, tables)
        })
    }
}

// ---------------------------------------------------------------------------
// Outfitting
// ---------------------------------------------------------------------------

/// One module on sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutfittingItem {
    pub id: i64,
    /// Canonical module identifier, e.g. `hpt_pulselaser_fixed_small`.
    pub module: String,
    pub module_text: String,
    pub buy_price: i64,
}

impl OutfittingItem {
    /// # Errors
    ///
    /// [`FieldError`] when `Name` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let raw = f.str_req("Name")?;
        Ok(Self {
            id: f.i64_or("id", 0),
            module: tables.canonical(raw),
            module_text: tables.friendly_text(raw),
            buy_price: f.i64_or("BuyPrice", 0),
        })
    }
}

/// Payload of `Outfitting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutfittingData {
    #[serde(flatten)]
    pub header: MarketHeader,
    pub horizons: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<CompletionBody<OutfittingItem>>,
}

impl OutfittingData {
    /// # Errors
    ///
    /// [`FieldError`] when `MarketID` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            header: MarketHeader::decode(f)?,
            horizons: f.bool_or("Horizons", false),
            items: f
                .objects("Items", |item| OutfittingItem::decode(&item, tables))
                .map(CompletionBody::from_primary),
        })
    }
}

impl Completable for OutfittingData {
    fn sidecar_kind(&self) -> SidecarKind {
        SidecarKind::Outfitting
    }

    fn needs_completion(&self) -> bool {
        self.items.is_none()
    }

    fn identity(&self) -> Option<i64> {
        Some(self.header.market_id)
    }

    fn body_digest(&self) -> Option<&str> {
        self.items.as_ref()?.digest.as_deref()
    }

    fn replace_body(
        &mut self,
        snapshot: &SidecarSnapshot,
        tables: &NameTables,
    ) -> Result<(), Rejection> {
        replace_listing(&mut self.header, &mut self.items, snapshot, "Items", |item| {
            OutfittingItem::decode(&item, tables)
        })
    }
}

// ---------------------------------------------------------------------------
// Shipyard
// ---------------------------------------------------------------------------

/// One ship on sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipyardItem {
    pub id: i64,
    pub ship: Localised,
    pub ship_price: i64,
}

impl ShipyardItem {
    /// # Errors
    ///
    /// [`FieldError`] when `ShipType` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            id: f.i64_or("id", 0),
            ship: localised(f, "ShipType", tables)
                .ok_or_else(|| FieldError::missing("ShipType"))?,
            ship_price: f.i64_or("ShipPrice", 0),
        })
    }
}

/// Payload of `Shipyard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipyardData {
    #[serde(flatten)]
    pub header: MarketHeader,
    pub horizons: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_list: Option<CompletionBody<ShipyardItem>>,
}

impl ShipyardData {
    /// # Errors
    ///
    /// [`FieldError`] when `MarketID` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            header: MarketHeader::decode(f)?,
            horizons: f.bool_or("Horizons", false),
            price_list: f
                .objects("PriceList", |item| ShipyardItem::decode(&item, tables))
                .map(CompletionBody::from_primary),
        })
    }
}

impl Completable for ShipyardData {
    fn sidecar_kind(&self) -> SidecarKind {
        SidecarKind::Shipyard
    }

    fn needs_completion(&self) -> bool {
        self.price_list.is_none()
    }

    fn identity(&self) -> Option<i64> {
        Some(self.header.market_id)
    }

    fn body_digest(&self) -> Option<&str> {
        self.price_list.as_ref()?.digest.as_deref()
    }

    fn replace_body(
        &mut self,
        snapshot: &SidecarSnapshot,
        tables: &NameTables,
    ) -> Result<(), Rejection> {
        replace_listing(
            &mut self.header,
            &mut self.price_list,
            snapshot,
            "PriceList",
            |item| ShipyardItem::decode(&item, tables),
        )
    }
}
