//! Guest book entry types.
//!
//! [`GuestEntry`] is the validated payload handed to the transport;
//! [`GuestbookRecord`] is what the server echoes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::still::StillImage;

/// Sentinel purpose that switches the form to free text.
pub const OTHER_PURPOSE: &str = "Other";

/// The closed set of visit purposes, in display order.
pub const PURPOSE_OPTIONS: [&str; 13] = [
    "President Director",
    "Chief Operating Officer",
    "Chief Financial and Risk Officer",
    "Corporate Secretary",
    "Finance Staff",
    "General Affairs Staff",
    "Human Resources Staff",
    "Administration Staff",
    "IT Staff",
    "Legal Staff",
    "Operations Staff",
    "Social Media Staff",
    OTHER_PURPOSE,
];

/// Check whether `purpose` is one of [`PURPOSE_OPTIONS`].
#[must_use]
pub fn is_known_purpose(purpose: &str) -> bool {
    PURPOSE_OPTIONS.contains(&purpose)
}

/// A validated entry, ready to send.
///
/// Text fields are trimmed and `purpose` never holds [`OTHER_PURPOSE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestEntry {
    /// Visitor name.
    pub name: String,
    /// Company or organization.
    pub origin: String,
    /// Who the visitor came to see.
    pub purpose: String,
    /// Reason for the visit.
    pub reason: String,
    /// Captured selfie.
    pub selfie_image: StillImage,
    /// Drawn signature.
    pub signature_image: StillImage,
}

/// The entry as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookRecord {
    /// Server-assigned identifier. Numeric ids are kept as their decimal text.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Visitor name.
    pub name: String,
    /// Company or organization.
    pub origin: String,
    /// Transmitted purpose.
    pub purpose: String,
    /// Reason for the visit.
    #[serde(default)]
    pub reason: Option<String>,
    /// Server location of the stored selfie.
    pub selfie_image: String,
    /// Server location of the stored signature.
    pub signature_image: String,
    /// Creation timestamp, verbatim.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GuestbookRecord {
    /// Parse `created_at` as RFC 3339, if present and well formed.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}
