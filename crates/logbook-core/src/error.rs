use std::fmt;

/// Machine-readable error codes for tooling and log consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    DuplicateTagRegistration,
    UnknownTag,
    WithdrawnTag,
    MissingMandatoryField,
    WrongFieldType,
    UnreadableRecord,
    SidecarUnavailable,
    SidecarTimestampMismatch,
    SidecarIdentityMismatch,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Every code, in catalog order.
    pub const ALL: [Self; 12] = [
        Self::ConfigParseError,
        Self::DuplicateTagRegistration,
        Self::UnknownTag,
        Self::WithdrawnTag,
        Self::MissingMandatoryField,
        Self::WrongFieldType,
        Self::UnreadableRecord,
        Self::SidecarUnavailable,
        Self::SidecarTimestampMismatch,
        Self::SidecarIdentityMismatch,
        Self::LockContention,
        Self::InternalUnexpected,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::DuplicateTagRegistration => "E1002",
            Self::UnknownTag => "E2001",
            Self::WithdrawnTag => "E2002",
            Self::MissingMandatoryField => "E2003",
            Self::WrongFieldType => "E2004",
            Self::UnreadableRecord => "E2005",
            Self::SidecarUnavailable => "E3001",
            Self::SidecarTimestampMismatch => "E3002",
            Self::SidecarIdentityMismatch => "E3003",
            Self::LockContention => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::DuplicateTagRegistration => "Event tag registered twice",
            Self::UnknownTag => "Unknown event tag",
            Self::WithdrawnTag => "Withdrawn event tag",
            Self::MissingMandatoryField => "Mandatory field missing",
            Self::WrongFieldType => "Field has an unexpected JSON type",
            Self::UnreadableRecord => "Journal line is not a record",
            Self::SidecarUnavailable => "Sidecar file not available",
            Self::SidecarTimestampMismatch => "Sidecar older than its primary record",
            Self::SidecarIdentityMismatch => "Sidecar belongs to a different market",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .logbook/config.toml and retry."),
            Self::DuplicateTagRegistration => {
                Some("Each event tag may be bound to exactly one decoder.")
            }
            Self::UnknownTag | Self::WithdrawnTag => None,
            Self::MissingMandatoryField | Self::WrongFieldType => {
                Some("The record is kept as an unknown event with its original content.")
            }
            Self::UnreadableRecord => Some("Check the journal file for truncated or corrupt lines."),
            Self::SidecarUnavailable | Self::SidecarTimestampMismatch => {
                Some("Retry after the game finishes writing the companion file.")
            }
            Self::SidecarIdentityMismatch => {
                Some("The companion file was rewritten for another station; reopen the service.")
            }
            Self::LockContention => Some("Retry after the game releases the companion file."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
