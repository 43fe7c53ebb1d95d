//! Social payloads: friends list and received messages.

use serde::Serialize;

use crate::normalize::{Localised, NameTables, localised, localised_text};
use crate::record::{FieldError, Fields};

/// Payload of `Friends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendsData {
    pub name: String,
    /// `Online`, `Offline`, `Requested`, `Declined`, `Added`, `Lost`.
    pub status: String,
}

impl FriendsData {
    /// # Errors
    ///
    /// [`FieldError`] when `Name` or `Status` is missing.
    pub fn decode(f: &Fields<'_>, _tables: &NameTables) -> Result<Self, FieldError> {
        Ok(Self {
            name: f.string_req("Name")?,
            status: f.string_req("Status")?,
        })
    }
}

/// Payload of `ReceiveText`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiveTextData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Localised>,
    /// Localized message text, or the friendly form of the raw symbol.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ReceiveTextData {
    /// # Errors
    ///
    /// [`FieldError`] when `Message` is missing.
    pub fn decode(f: &Fields<'_>, tables: &NameTables) -> Result<Self, FieldError> {
        let raw = f.str_req("Message")?;
        // Player chat is free text; only NPC symbols get a friendly name.
        let message = if raw.starts_with('$') {
            localised_text(raw, f.str("Message_Localised"), tables)
        } else {
            raw.to_string()
        };
        Ok(Self {
            from: localised(f, "From", tables),
            message,
            channel: f.string("Channel"),
        })
    }
}
