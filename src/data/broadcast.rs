//! Broadcast channels.
//!
//! Row layout: `id;name;type;password;default_sel[;description_es;description_gl;description_en]`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{assign_ordered_locales, parse_flag, timestamp_now, LocalizedText};
use crate::import::reader::RawRow;

const DESCRIPTION_START: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastType {
    Public,
    Private,
    /// Restricted by password.
    Corporative,
}

impl BroadcastType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Corporative => "corporative",
        }
    }

    /// Parses the type column, as a word (`public`) or as the platform code (`PUB`).
    /// Anything unrecognised becomes [`BroadcastType::Private`].
    pub fn from_column(raw: &str) -> Self {
        match raw.trim() {
            "public" | "PUB" => Self::Public,
            "corporative" | "COR" => Self::Corporative,
            _ => Self::Private,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub broadcast_type: BroadcastType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub default_selection: bool,
    #[serde(default)]
    pub description: LocalizedText,
    pub created_at: String,
}

/// The shape gate has already ensured 5 or 8 columns.
pub fn build(row: &RawRow) -> Broadcast {
    let column = move |index: usize| row.get(index).unwrap_or_default();

    let mut description = LocalizedText::new();
    assign_ordered_locales(row, DESCRIPTION_START, &mut description);

    Broadcast {
        id: Uuid::new_v4(),
        name: column(1).to_string(),
        broadcast_type: BroadcastType::from_column(column(2)),
        password: Some(column(3))
            .filter(|password| !password.is_empty())
            .map(str::to_string),
        default_selection: parse_flag(column(4)),
        description,
        created_at: timestamp_now(),
    }
}
