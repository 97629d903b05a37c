//! The HEADER section's three standard pseudo-entities.
//!
//! `FILE_DESCRIPTION`, `FILE_NAME`, and `FILE_SCHEMA` are ordinary entities
//! as far as rendering is concerned; they go through the same compiler and
//! formatter as user data, they just print without a `#id=` prefix.

use serde::Serialize;

use crate::model::{Attribute, Entity};

/// Part 21 implementation level written into `FILE_DESCRIPTION`.
const IMPLEMENTATION_LEVEL: &str = "2;1";

/// Descriptive fields of a STEP file's HEADER section.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FileHeader {
    /// Informal description of the file contents.
    pub description: Vec<String>,
    /// File name, conventionally the name the file was written under.
    pub file_name: String,
    /// ISO 8601 timestamp of when the file was produced.
    pub timestamp: String,
    /// Author name(s).
    pub authors: Vec<String>,
    /// Originating organization(s).
    pub organizations: Vec<String>,
    /// Name and version of the writing software.
    pub preprocessor_version: String,
    /// System the data originates from.
    pub originating_system: String,
    /// Authorization of the person approving the exchange.
    pub authorization: String,
    /// EXPRESS schema identifiers (e.g., `AUTOMOTIVE_DESIGN`).
    pub schemas: Vec<String>,
}

impl FileHeader {
    /// Build the three header pseudo-entities in their mandatory order.
    pub fn to_entities(&self) -> Vec<Entity> {
        vec![
            Entity::new("FILE_DESCRIPTION")
                .with(text_list(&self.description))
                .with(Attribute::Text(IMPLEMENTATION_LEVEL.into())),
            Entity::new("FILE_NAME")
                .with(Attribute::Text(self.file_name.clone()))
                .with(Attribute::Text(self.timestamp.clone()))
                .with(text_list(&self.authors))
                .with(text_list(&self.organizations))
                .with(Attribute::Text(self.preprocessor_version.clone()))
                .with(Attribute::Text(self.originating_system.clone()))
                .with(Attribute::Text(self.authorization.clone())),
            Entity::new("FILE_SCHEMA").with(text_list(&self.schemas)),
        ]
    }

    /// Reassemble header fields from parsed pseudo-entities.
    ///
    /// Tolerant inverse of [`FileHeader::to_entities`]: unknown entities and
    /// missing or mistyped arguments leave the corresponding fields at their
    /// defaults.
    pub fn from_entities(entities: &[Entity]) -> Self {
        let mut header = FileHeader::default();
        for entity in entities {
            let arg = |idx: usize| entity.attributes.get(idx);
            match entity.type_name.as_str() {
                "FILE_DESCRIPTION" => {
                    header.description = string_items(arg(0));
                }
                "FILE_NAME" => {
                    header.file_name = string_item(arg(0));
                    header.timestamp = string_item(arg(1));
                    header.authors = string_items(arg(2));
                    header.organizations = string_items(arg(3));
                    header.preprocessor_version = string_item(arg(4));
                    header.originating_system = string_item(arg(5));
                    header.authorization = string_item(arg(6));
                }
                "FILE_SCHEMA" => {
                    header.schemas = string_items(arg(0));
                }
                _ => {}
            }
        }
        header
    }
}

fn text_list(items: &[String]) -> Attribute {
    Attribute::List(
        items
            .iter()
            .map(|s| Attribute::Text(s.clone()))
            .collect(),
    )
}

fn string_item(attribute: Option<&Attribute>) -> String {
    attribute
        .and_then(|a| a.as_text())
        .unwrap_or_default()
        .to_string()
}

fn string_items(attribute: Option<&Attribute>) -> Vec<String> {
    attribute
        .and_then(|a| a.as_list())
        .map(|items| {
            items
                .iter()
                .filter_map(|a| a.as_text())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
