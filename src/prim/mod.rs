// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Primitive types: logical fields, values, conversions, keywords, records.

pub mod conv;
mod field;
mod keywords;
mod record;

pub use field::{FieldValue, LogicalField, ValueKind};
pub use keywords::{
  DISPLAY_SEPARATOR, KeywordSet, STORAGE_SEPARATOR, merge_country_keywords,
  remove_country_keywords,
};
pub use record::{ImageMetadataRecord, Selection};
