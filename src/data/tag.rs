//! Taxonomy tags: header-driven rows, parent resolution through the run's tag arena.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{parse_flag, timestamp_now, BuildContext, LocalizedText};
use crate::error::{ImportError, RowError};
use crate::import::reader::RawRow;

pub const ROOT_CODE: &str = "ROOT";
pub const FALLBACK_LOCALE: &str = "en";

pub const CODE_COLUMN: &str = "cod";
pub const PARENT_COLUMN: &str = "tree_parent_cod";
pub const METATAG_COLUMN: &str = "metatag";
pub const DISPLAY_COLUMN: &str = "display";
pub const FALLBACK_TITLE_COLUMN: &str = "name_en";

/// Columns a tag file header must name (after alias normalisation).
pub const REQUIRED_COLUMNS: [&str; 5] = [
    CODE_COLUMN,
    PARENT_COLUMN,
    METATAG_COLUMN,
    DISPLAY_COLUMN,
    FALLBACK_TITLE_COLUMN,
];

const COLUMN_ALIASES: [(&str, &str); 4] = [
    ("code", CODE_COLUMN),
    ("parent_code", PARENT_COLUMN),
    ("is_metatag", METATAG_COLUMN),
    ("is_displayable", DISPLAY_COLUMN),
];

const PROPERTY_PREFIX: &str = "property_";
const TITLE_PREFIX: &str = "name_";
const DESCRIPTION_PREFIX: &str = "description_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
    pub metatag: bool,
    pub display: bool,
    pub title: LocalizedText,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description: LocalizedText,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Nested-set coordinates, filled by the reindex pass. Zero until then.
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_code: Option<String>,
    pub created_at: String,
}

impl Tag {
    /// The synthetic top of the forest. Every tag without a resolvable parent hangs off it.
    pub fn root(locales: &[String]) -> Self {
        let title = locales
            .iter()
            .map(|locale| (locale.clone(), ROOT_CODE.to_string()))
            .collect();
        Tag {
            id: Uuid::new_v4(),
            code: ROOT_CODE.to_string(),
            parent_code: None,
            metatag: true,
            display: false,
            title,
            description: LocalizedText::new(),
            properties: BTreeMap::new(),
            left: 0,
            right: 0,
            level: 0,
            root_code: None,
            created_at: timestamp_now(),
        }
    }

    pub fn title(&self, locale: &str) -> Option<&str> {
        self.title
            .get(locale)
            .or_else(|| self.title.get(FALLBACK_LOCALE))
            .map(String::as_str)
    }

    /// True when `other` lies strictly inside this tag's nested-set interval.
    pub fn is_ancestor_of(&self, other: &Tag) -> bool {
        self.root_code == other.root_code && self.left < other.left && other.right < self.right
    }
}

/// Column layout of one tag file, taken from its header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl TagHeader {
    /// Normalises aliases and checks the required set. `path` is only used in the error.
    pub fn parse(cells: Vec<String>, path: &Path) -> Result<Self, ImportError> {
        let columns: Vec<String> = cells
            .into_iter()
            .map(|cell| canonical_column(cell.trim()).to_string())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|column| column == *required))
            .map(|required| (*required).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingRequiredColumns {
                path: path.to_path_buf(),
                missing,
            });
        }

        let mut index = HashMap::new();
        for (position, column) in columns.iter().enumerate() {
            index.entry(column.clone()).or_insert(position);
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of a named column. `None` when the header lacks the column or the row is short.
    pub fn value<'r>(&self, row: &'r RawRow, column: &str) -> Option<&'r str> {
        self.index.get(column).and_then(|&position| row.get(position))
    }
}

fn canonical_column(name: &str) -> &str {
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// Builds a tag from a row. Parent lookup: in-batch arena, then store, then the arena's root.
/// The caller persists the tag and registers it in the arena.
pub fn build(row: &RawRow, header: &TagHeader, ctx: &BuildContext<'_>) -> Result<Tag, RowError> {
    let code = header
        .value(row, CODE_COLUMN)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(RowError::MissingField(CODE_COLUMN))?;

    if let Some(existing) = ctx.arena.get(code) {
        return Err(RowError::DuplicateCode {
            code: code.to_string(),
            existing_id: existing.id,
        });
    }
    if let Some(existing) = ctx.store.find_tag_by_code(code)? {
        return Err(RowError::DuplicateCode {
            code: code.to_string(),
            existing_id: existing.id,
        });
    }

    let declared_parent = header
        .value(row, PARENT_COLUMN)
        .map(str::trim)
        .unwrap_or_default();
    let parent_code = ctx.arena.resolve_parent(declared_parent, ctx.store)?;

    let fallback_title = header
        .value(row, FALLBACK_TITLE_COLUMN)
        .unwrap_or_default();
    let mut title = LocalizedText::new();
    for locale in ctx.locales {
        let value = header
            .value(row, &format!("{TITLE_PREFIX}{locale}"))
            .unwrap_or(fallback_title);
        title.insert(locale.clone(), value.to_string());
    }

    let mut description = LocalizedText::new();
    let mut properties = BTreeMap::new();
    for column in header.columns() {
        let Some(value) = header.value(row, column) else {
            continue;
        };
        if let Some(name) = column.strip_prefix(PROPERTY_PREFIX) {
            if !name.is_empty() {
                properties.insert(name.to_string(), value.to_string());
            }
        } else if let Some(locale) = column.strip_prefix(DESCRIPTION_PREFIX) {
            if ctx.locales.iter().any(|known| known == locale) {
                description.insert(locale.to_string(), value.to_string());
            }
        }
    }

    Ok(Tag {
        id: Uuid::new_v4(),
        code: code.to_string(),
        parent_code,
        metatag: header.value(row, METATAG_COLUMN).map(parse_flag).unwrap_or(false),
        display: header.value(row, DISPLAY_COLUMN).map(parse_flag).unwrap_or(false),
        title,
        description,
        properties,
        left: 0,
        right: 0,
        level: 0,
        root_code: None,
        created_at: timestamp_now(),
    })
}
