//! Contributor roles.
//!
//! Row layout: `id;cod;xml;display;name_es[;name_gl;name_en[;text_es;text_gl;text_en]]`.
//! The Spanish name is taken as given, an empty value is accepted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{assign_ordered_locales, parse_flag, timestamp_now, LocalizedText};
use crate::import::reader::RawRow;

const NAME_START: usize = 4;
const TEXT_START: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    /// Code in the external (EBU/XML) role vocabulary.
    pub xml: String,
    pub display: bool,
    pub name: LocalizedText,
    #[serde(default)]
    pub text: LocalizedText,
    pub created_at: String,
}

/// The shape gate has already ensured 7 or 10 columns.
pub fn build(row: &RawRow) -> Role {
    let column = move |index: usize| row.get(index).unwrap_or_default();

    let mut name = LocalizedText::new();
    assign_ordered_locales(row, NAME_START, &mut name);
    let mut text = LocalizedText::new();
    assign_ordered_locales(row, TEXT_START, &mut text);

    Role {
        id: Uuid::new_v4(),
        code: column(1).trim().to_string(),
        xml: column(2).trim().to_string(),
        display: parse_flag(column(3)),
        name,
        text,
        created_at: timestamp_now(),
    }
}
