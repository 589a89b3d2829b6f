//! Record schemas for the four reference catalogs and the row builders that produce them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RowError;
use crate::import::reader::RawRow;
use crate::import::tree::TagArena;
use crate::store::Store;

pub mod broadcast;
pub mod permission_profile;
pub mod role;
pub mod tag;

pub use broadcast::{Broadcast, BroadcastType};
pub use permission_profile::{PermissionCatalog, PermissionProfile, PermissionScope};
pub use role::Role;
pub use tag::{Tag, TagHeader};

/// Locale -> text.
pub type LocalizedText = BTreeMap<String, String>;

/// Locale order of the unlabeled translation columns in broadcast and role files.
/// Position implies locale; reordering columns upstream silently mislabels text.
pub const FIXED_LOCALE_ORDER: [&str; 3] = ["es", "gl", "en"];

/// The catalogs this tool can seed, in the order `all` runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Tag,
    Broadcast,
    Role,
    PermissionProfile,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 4] = [
        CatalogKind::Tag,
        CatalogKind::Broadcast,
        CatalogKind::Role,
        CatalogKind::PermissionProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Broadcast => "broadcast",
            Self::Role => "role",
            Self::PermissionProfile => "permissionprofile",
        }
    }

    /// Directory name under the data dir scanned when no explicit file is given.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Tag => "tags",
            Self::Broadcast => "broadcasts",
            Self::Role => "roles",
            Self::PermissionProfile => "permissionprofiles",
        }
    }

    /// Row shape gate. Tag rows are header-driven and accept any width.
    pub fn accepts_columns(&self, columns: usize) -> bool {
        match self {
            Self::Tag => true,
            Self::Broadcast => columns == 5 || columns == 8,
            Self::Role => columns == 7 || columns == 10,
            Self::PermissionProfile => columns == 6,
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted record of any catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Tag(Tag),
    Broadcast(Broadcast),
    Role(Role),
    PermissionProfile(PermissionProfile),
}

impl Record {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Tag(tag) => tag.id,
            Self::Broadcast(broadcast) => broadcast.id,
            Self::Role(role) => role.id,
            Self::PermissionProfile(profile) => profile.id,
        }
    }

    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::Tag(_) => CatalogKind::Tag,
            Self::Broadcast(_) => CatalogKind::Broadcast,
            Self::Role(_) => CatalogKind::Role,
            Self::PermissionProfile(_) => CatalogKind::PermissionProfile,
        }
    }

    /// Human-readable key for reporting, e.g. `cod: ROOT` or `name: Editor`.
    pub fn describe(&self) -> String {
        match self {
            Self::Tag(tag) => format!("cod: {}", tag.code),
            Self::Broadcast(broadcast) => format!(
                "name: {}, type: {}",
                broadcast.name,
                broadcast.broadcast_type.as_str()
            ),
            Self::Role(role) => format!("code: {}", role.code),
            Self::PermissionProfile(profile) => format!("name: {}", profile.name),
        }
    }
}

/// Read-only state every builder may consult. Built per row by the driver.
pub struct BuildContext<'a> {
    pub locales: &'a [String],
    pub permissions: &'a PermissionCatalog,
    pub arena: &'a TagArena,
    pub store: &'a dyn Store,
}

/// Per-file dispatch onto the builder of one catalog.
#[derive(Debug, Clone)]
pub enum RowSchema {
    Tag(TagHeader),
    Broadcast,
    Role,
    PermissionProfile,
}

impl RowSchema {
    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::Tag(_) => CatalogKind::Tag,
            Self::Broadcast => CatalogKind::Broadcast,
            Self::Role => CatalogKind::Role,
            Self::PermissionProfile => CatalogKind::PermissionProfile,
        }
    }

    /// Applies the shape gate, then the catalog's builder. Nothing is persisted here.
    pub fn build(&self, row: &RawRow, ctx: &BuildContext<'_>) -> Result<Record, RowError> {
        if !self.kind().accepts_columns(row.len()) {
            return Err(RowError::Malformed { columns: row.len() });
        }
        match self {
            Self::Tag(header) => tag::build(row, header, ctx).map(Record::Tag),
            Self::Broadcast => Ok(Record::Broadcast(broadcast::build(row))),
            Self::Role => Ok(Record::Role(role::build(row))),
            Self::PermissionProfile => Ok(Record::PermissionProfile(permission_profile::build(
                row,
                ctx.permissions,
            ))),
        }
    }
}

/// Boolean columns: `1`, `true`, `yes` (any case) are true, everything else false.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Copies the positional translation columns starting at `start` into `target`,
/// following [`FIXED_LOCALE_ORDER`]. Absent columns leave the locale unset.
pub fn assign_ordered_locales(row: &RawRow, start: usize, target: &mut LocalizedText) {
    for (offset, locale) in FIXED_LOCALE_ORDER.iter().enumerate() {
        if let Some(value) = row.get(start + offset) {
            target.insert((*locale).to_string(), value.to_string());
        }
    }
}

pub(crate) fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_gate_matches_catalog_widths() {
        assert!(CatalogKind::Tag.accepts_columns(1));
        assert!(CatalogKind::Broadcast.accepts_columns(5));
        assert!(CatalogKind::Broadcast.accepts_columns(8));
        assert!(!CatalogKind::Broadcast.accepts_columns(6));
        assert!(CatalogKind::Role.accepts_columns(7));
        assert!(CatalogKind::Role.accepts_columns(10));
        assert!(!CatalogKind::Role.accepts_columns(9));
        assert!(CatalogKind::PermissionProfile.accepts_columns(6));
        assert!(!CatalogKind::PermissionProfile.accepts_columns(5));
    }

    #[test]
    fn flags_accept_numeric_and_word_forms() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn ordered_locales_follow_es_gl_en() {
        let row = RawRow::new(1, ["a", "b", "c", "d"]);
        let mut text = LocalizedText::new();
        assign_ordered_locales(&row, 1, &mut text);
        assert_eq!(text.get("es").map(String::as_str), Some("b"));
        assert_eq!(text.get("gl").map(String::as_str), Some("c"));
        assert_eq!(text.get("en").map(String::as_str), Some("d"));

        let mut partial = LocalizedText::new();
        assign_ordered_locales(&row, 3, &mut partial);
        assert_eq!(partial.len(), 1);
        assert_eq!(partial.get("es").map(String::as_str), Some("d"));
    }
}
