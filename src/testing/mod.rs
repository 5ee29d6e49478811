// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Test-only utilities.

mod asserts;
mod dates;
mod fake;

use std::collections::BTreeMap;

pub use dates::*;
pub use fake::*;

pub use crate::{assert_err, raw_tags};
use crate::prim::ImageMetadataRecord;

/// Builds a record from literal raw tags, with no file size or creation time.
pub fn make_record(path: &str, raw_tags: BTreeMap<String, String>) -> ImageMetadataRecord {
  ImageMetadataRecord::from_raw_tags(path.into(), raw_tags, 0, None)
}

#[macro_export]
macro_rules! raw_tags {
  ($($key:literal => $value:expr),* $(,)?) => {{
    #[allow(unused_mut)]
    let mut tags = std::collections::BTreeMap::<String, String>::new();
    $(
      tags.insert($key.to_string(), $value.to_string());
    )*
    tags
  }}
}
