// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Logical metadata fields and their values.
//!
//! A logical field is one semantic fact about a photo (taken time, latitude,
//! city), independent of which physical EXIF/XMP/IPTC tags encode it. The
//! mapping to physical tags lives in `crate::tags`.

use chrono::{FixedOffset, NaiveDateTime};

use super::KeywordSet;

/// Every logical field the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalField {
  /// Moment of capture, local time. Paired with `TzOffset`.
  TakenDate,
  /// Moment of digitization, local time. Paired with `TzOffset`.
  CreatedDate,
  /// GPS timestamp. Always UTC.
  GpsDate,
  /// UTC offset of the local times, as `±HH:MM`.
  TzOffset,
  Latitude,
  Longitude,
  Country,
  /// ISO 3166-1 alpha-3.
  CountryCode,
  City,
  Sublocation,
  Headline,
  Keywords,
  CameraModel,
}

/// The value type a field is declared to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
  Timestamp,
  Offset,
  Degrees,
  Text,
  TextSet,
}

impl LogicalField {
  pub const ALL: [LogicalField; 13] = [
    LogicalField::TakenDate,
    LogicalField::CreatedDate,
    LogicalField::GpsDate,
    LogicalField::TzOffset,
    LogicalField::Latitude,
    LogicalField::Longitude,
    LogicalField::Country,
    LogicalField::CountryCode,
    LogicalField::City,
    LogicalField::Sublocation,
    LogicalField::Headline,
    LogicalField::Keywords,
    LogicalField::CameraModel,
  ];

  #[must_use]
  pub fn value_kind(self) -> ValueKind {
    match self {
      LogicalField::TakenDate | LogicalField::CreatedDate | LogicalField::GpsDate => {
        ValueKind::Timestamp
      }
      LogicalField::TzOffset => ValueKind::Offset,
      LogicalField::Latitude | LogicalField::Longitude => ValueKind::Degrees,
      LogicalField::Keywords => ValueKind::TextSet,
      _ => ValueKind::Text,
    }
  }

  /// Coordinates are set from map placement or parsed pairs, never edited as
  /// free text. Their display form is derived.
  #[must_use]
  pub fn editable_as_text(self) -> bool {
    !matches!(self, LogicalField::Latitude | LogicalField::Longitude)
  }
}

/// One value of a logical field. Which variant a field uses is fixed by
/// `LogicalField::value_kind`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  /// Local time for `TakenDate`/`CreatedDate`, UTC for `GpsDate`.
  Timestamp(NaiveDateTime),
  Offset(FixedOffset),
  Degrees(f64),
  Text(String),
  Set(KeywordSet),
}

impl FieldValue {
  /// An empty value never overwrites an existing one during batch apply.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    match self {
      FieldValue::Text(s) => s.is_empty(),
      FieldValue::Set(k) => k.is_empty(),
      _ => false,
    }
  }

  #[must_use]
  pub fn matches(&self, kind: ValueKind) -> bool {
    matches!(
      (self, kind),
      (FieldValue::Timestamp(_), ValueKind::Timestamp)
        | (FieldValue::Offset(_), ValueKind::Offset)
        | (FieldValue::Degrees(_), ValueKind::Degrees)
        | (FieldValue::Text(_), ValueKind::Text)
        | (FieldValue::Set(_), ValueKind::TextSet)
    )
  }
}
