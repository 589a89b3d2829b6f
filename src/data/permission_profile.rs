//! Permission profiles.
//!
//! Row layout: `id;name;system;default;scope;permissions`. The permissions column is a list of
//! permission keys separated by commas and/or whitespace, with two reserved tokens:
//! `none` (no permissions) and `all` (every known permission at import time).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{parse_flag, timestamp_now};
use crate::import::reader::RawRow;

pub const TOKEN_NONE: &str = "none";
pub const TOKEN_ALL: &str = "all";

/// Permission keys the platform ships with.
pub const BUILTIN_PERMISSIONS: &[&str] = &[
    "ACCESS_DASHBOARD",
    "ACCESS_MULTIMEDIA_SERIES",
    "ACCESS_LIVE_CHANNELS",
    "ACCESS_LIVE_EVENTS",
    "ACCESS_JOBS",
    "ACCESS_PEOPLE",
    "ACCESS_TAGS",
    "ACCESS_BROADCASTS",
    "ACCESS_SERIES_TYPES",
    "ACCESS_ADMIN_USERS",
    "ACCESS_PERMISSION_PROFILES",
    "ACCESS_ROLES",
    "ACCESS_IMPORTER",
    "ACCESS_INGESTOR",
    "ACCESS_PUBLICATION_TAB",
    "ACCESS_WIZARD_UPLOAD",
    "ACCESS_ADVANCED_UPLOAD",
    "ACCESS_EDIT_PLAYLIST",
    "CHANGE_MMOBJECT_STATUS",
    "CHANGE_MMOBJECT_PUBCHANNEL",
    "MODIFY_OWNER",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionScope {
    #[serde(rename = "ROLE_SCOPE_GLOBAL")]
    Global,
    #[serde(rename = "ROLE_SCOPE_PERSONAL")]
    Personal,
    #[serde(rename = "ROLE_SCOPE_NONE")]
    Unscoped,
}

impl PermissionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "ROLE_SCOPE_GLOBAL",
            Self::Personal => "ROLE_SCOPE_PERSONAL",
            Self::Unscoped => "ROLE_SCOPE_NONE",
        }
    }

    /// Accepts the short (`global`) and long (`ROLE_SCOPE_GLOBAL`) spellings.
    pub fn from_column(raw: &str) -> Option<Self> {
        match raw.trim() {
            "global" | "ROLE_SCOPE_GLOBAL" => Some(Self::Global),
            "personal" | "ROLE_SCOPE_PERSONAL" => Some(Self::Personal),
            "none" | "ROLE_SCOPE_NONE" => Some(Self::Unscoped),
            _ => None,
        }
    }
}

/// The known permission keys, snapshotted when the import starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    known: BTreeSet<String>,
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::from_keys(BUILTIN_PERMISSIONS.iter().copied())
    }
}

impl PermissionCatalog {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.known.contains(key)
    }

    pub fn all(&self) -> &BTreeSet<String> {
        &self.known
    }

    /// Resolves a permissions column. The first reserved token wins: `none` yields the empty
    /// set and `all` the full catalog, whatever else the column lists. Unknown keys are ignored.
    pub fn resolve(&self, raw: &str) -> BTreeSet<String> {
        let mut granted = BTreeSet::new();
        for token in raw
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|token| !token.is_empty())
        {
            match token {
                TOKEN_NONE => return BTreeSet::new(),
                TOKEN_ALL => return self.known.clone(),
                key if self.known.contains(key) => {
                    granted.insert(key.to_string());
                }
                _ => {}
            }
        }
        granted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionProfile {
    pub id: Uuid,
    pub name: String,
    pub system: bool,
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<PermissionScope>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    pub created_at: String,
}

/// The shape gate has already ensured 6 columns. An unknown scope leaves the scope unset.
pub fn build(row: &RawRow, catalog: &PermissionCatalog) -> PermissionProfile {
    let column = move |index: usize| row.get(index).unwrap_or_default();

    PermissionProfile {
        id: Uuid::new_v4(),
        name: column(1).to_string(),
        system: parse_flag(column(2)),
        default: parse_flag(column(3)),
        scope: PermissionScope::from_column(column(4)),
        permissions: catalog.resolve(column(5)),
        created_at: timestamp_now(),
    }
}
