//! Typed document schema for the marking service.
//!
//! The client itself treats documents as opaque `Serialize` values. These types
//! describe the "create document" payload so callers can build it with type
//! checking; the JSON keys follow the service's naming. Unknown keys are
//! rejected when parsing, missing ones default to empty.

use serde::{Deserialize, Serialize};

/// A goods introduction document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrptDocument {
    #[serde(default)]
    pub description: Option<Description>,
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub doc_status: String,
    #[serde(default)]
    pub doc_type: String,
    #[serde(default, rename = "importRequest")]
    pub import_request: bool,
    #[serde(default)]
    pub owner_inn: String,
    #[serde(default)]
    pub participant_inn: String,
    #[serde(default)]
    pub producer_inn: String,
    #[serde(default)]
    pub production_date: String,
    #[serde(default)]
    pub production_type: String,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub reg_date: String,
    #[serde(default)]
    pub reg_number: String,
}

/// Descriptive metadata attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
    #[serde(default, rename = "participantInn")]
    pub participant_inn: String,
}

/// One product entry of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    #[serde(default)]
    pub certificate_document: String,
    #[serde(default)]
    pub certificate_document_date: String,
    #[serde(default)]
    pub certificate_document_number: String,
    #[serde(default)]
    pub owner_inn: String,
    #[serde(default)]
    pub producer_inn: String,
    #[serde(default)]
    pub production_date: String,
    #[serde(default)]
    pub tnved_code: String,
    #[serde(default)]
    pub uit_code: String,
    #[serde(default)]
    pub uitu_code: String,
}
