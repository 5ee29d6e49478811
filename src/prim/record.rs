// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Per-file metadata record and selections over a session's records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDateTime};

use super::{FieldValue, KeywordSet, LogicalField, conv};
use crate::error::Error;
use crate::tags;

/// One photo's metadata: the raw tag dictionary as read, the derived logical
/// field values, and the set of fields edited since the last flush.
#[derive(Debug, Clone)]
pub struct ImageMetadataRecord {
  path:            PathBuf,
  raw_tags:        BTreeMap<String, String>,
  values:          BTreeMap<LogicalField, FieldValue>,
  dirty:           BTreeSet<LogicalField>,
  size:            u64,
  ctime:           Option<NaiveDateTime>,
  created_derived: bool,
}

impl ImageMetadataRecord {
  /// Builds a record from a raw tag read. Each logical field resolves through
  /// the namespace map; unparsable tags degrade to "absent". When the file
  /// has a taken date but no created date, the created date is derived from
  /// it. The derivation is not an edit, but is flagged so a scan can persist
  /// it back.
  #[must_use]
  pub fn from_raw_tags(
    path: PathBuf,
    raw_tags: BTreeMap<String, String>,
    size: u64,
    ctime: Option<NaiveDateTime>,
  ) -> Self {
    let mut values = BTreeMap::new();
    for field in LogicalField::ALL {
      if let Some(value) = tags::resolve_read(&raw_tags, field) {
        values.insert(field, value);
      }
    }

    let mut created_derived = false;
    if !values.contains_key(&LogicalField::CreatedDate)
      && let Some(FieldValue::Timestamp(taken)) = values.get(&LogicalField::TakenDate)
    {
      values.insert(LogicalField::CreatedDate, FieldValue::Timestamp(*taken));
      created_derived = true;
    }

    Self {
      path,
      raw_tags,
      values,
      dirty: BTreeSet::new(),
      size,
      ctime,
      created_derived,
    }
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Updated by the batch planner after a successful rename.
  pub fn set_path(&mut self, path: PathBuf) {
    self.path = path;
  }

  #[must_use]
  pub fn size(&self) -> u64 {
    self.size
  }

  #[must_use]
  pub fn raw_tags(&self) -> &BTreeMap<String, String> {
    &self.raw_tags
  }

  #[must_use]
  pub fn get(&self, field: LogicalField) -> Option<&FieldValue> {
    self.values.get(&field)
  }

  #[must_use]
  pub fn is_dirty(&self) -> bool {
    !self.dirty.is_empty()
  }

  #[must_use]
  pub fn dirty_fields(&self) -> &BTreeSet<LogicalField> {
    &self.dirty
  }

  pub fn clear_dirty(&mut self) {
    self.dirty.clear();
  }

  /// True when the created date was filled in from the taken date at load
  /// rather than read from a tag.
  #[must_use]
  pub fn created_date_was_derived(&self) -> bool {
    self.created_derived
  }

  #[must_use]
  pub fn taken_date(&self) -> Option<NaiveDateTime> {
    match self.get(LogicalField::TakenDate) {
      Some(FieldValue::Timestamp(t)) => Some(*t),
      _ => None,
    }
  }

  #[must_use]
  pub fn tz_offset(&self) -> Option<FixedOffset> {
    match self.get(LogicalField::TzOffset) {
      Some(FieldValue::Offset(o)) => Some(*o),
      _ => None,
    }
  }

  #[must_use]
  pub fn latitude(&self) -> Option<f64> {
    match self.get(LogicalField::Latitude) {
      Some(FieldValue::Degrees(d)) => Some(*d),
      _ => None,
    }
  }

  #[must_use]
  pub fn longitude(&self) -> Option<f64> {
    match self.get(LogicalField::Longitude) {
      Some(FieldValue::Degrees(d)) => Some(*d),
      _ => None,
    }
  }

  #[must_use]
  pub fn keywords(&self) -> KeywordSet {
    match self.get(LogicalField::Keywords) {
      Some(FieldValue::Set(k)) => k.clone(),
      _ => KeywordSet::default(),
    }
  }

  /// Sets a field, marking it dirty only when the value actually changes.
  pub fn set(&mut self, field: LogicalField, value: FieldValue) {
    debug_assert!(value.matches(field.value_kind()));
    if self.values.get(&field) == Some(&value) {
      return;
    }
    self.values.insert(field, value);
    self.dirty.insert(field);
  }

  /// Clears a field, marking it dirty when it was set.
  pub fn clear(&mut self, field: LogicalField) {
    if self.values.remove(&field).is_some() {
      self.dirty.insert(field);
    }
  }

  /// Sets the taken date. The GPS date is left untouched; recomputing it is
  /// an explicit operation.
  pub fn set_taken_date(&mut self, taken: NaiveDateTime) {
    self.set(LogicalField::TakenDate, FieldValue::Timestamp(taken));
  }

  /// Sets the time zone offset. When a taken date is present the GPS date is
  /// recomputed from it; otherwise only the offset changes.
  pub fn set_tz_offset(&mut self, offset: FixedOffset) {
    self.set(LogicalField::TzOffset, FieldValue::Offset(offset));
    if let Some(taken) = self.taken_date() {
      self.set(
        LogicalField::GpsDate,
        FieldValue::Timestamp(conv::gps_date_from_taken(&taken, offset)),
      );
    }
  }

  /// Recomputes the GPS date from the taken date and stored offset. Returns
  /// false when there is no taken date to derive from.
  pub fn set_gps_date_from_taken(&mut self) -> Result<bool, Error> {
    let Some(taken) = self.taken_date() else {
      return Ok(false);
    };
    let offset = self
      .tz_offset()
      .ok_or_else(|| Error::MissingOffset(self.path.clone()))?;

    self.set(
      LogicalField::GpsDate,
      FieldValue::Timestamp(conv::gps_date_from_taken(&taken, offset)),
    );
    Ok(true)
  }

  /// Sets the taken date from the file's creation timestamp, for photos with
  /// no capture metadata at all. When no offset is stored and a default zone
  /// is configured, the offset is filled in from it (which also derives the
  /// GPS date).
  pub fn set_taken_date_from_file_ctime(
    &mut self,
    default_time_zone: Option<&str>,
  ) -> Result<(), Error> {
    let ctime = self
      .ctime
      .ok_or_else(|| Error::MissingCreationTime(self.path.clone()))?;

    self.set_taken_date(ctime);
    if self.tz_offset().is_none()
      && let Some(zone) = default_time_zone
    {
      self.set_tz_offset(conv::offset_for(&ctime, zone)?);
    }
    Ok(())
  }
}

/// An ordered pick of records by session index. The first entry is the
/// primary, whose values seed batch edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  indices: Vec<usize>,
}

impl Selection {
  #[must_use]
  pub fn new(indices: Vec<usize>) -> Self {
    let mut selection = Self::default();
    for index in indices {
      selection.push(index);
    }
    selection
  }

  /// Appends an index, ignoring duplicates. Order of first appearance is the
  /// apply order.
  pub fn push(&mut self, index: usize) {
    if !self.indices.contains(&index) {
      self.indices.push(index);
    }
  }

  #[must_use]
  pub fn primary(&self) -> Option<usize> {
    self.indices.first().copied()
  }

  #[must_use]
  pub fn indices(&self) -> &[usize] {
    &self.indices
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.indices.len()
  }
}




#[cfg(test)]
mod test_set_taken_date {
  use super::*;
  use crate::testing::*;

  #[test]
  fn does_not_recompute_gps_date() {
    let mut record = make_record(
      "a.jpg",
      raw_tags!(
        "EXIF:DateTimeOriginal" => "2000:01:01 12:00:00",
        "EXIF:OffsetTimeOriginal" => "+09:00",
        "EXIF:GPSDateStamp" => "2000:01:01",
        "EXIF:GPSTimeStamp" => "03:00:00",
      ),
    );

    record.set_taken_date(make_date_naive(2000, 6, 1, 12, 0, 0));

    assert_eq!(
      record.get(LogicalField::GpsDate),
      Some(&FieldValue::Timestamp(make_date_naive(2000, 1, 1, 3, 0, 0)))
    );
    assert!(!record.dirty_fields().contains(&LogicalField::GpsDate));
  }
}

#[cfg(test)]
mod test_set_gps_date_from_taken {
  use super::*;
  use crate::testing::*;

  #[test]
  fn errors_without_offset() {
    let mut record = make_record(
      "a.jpg",
      raw_tags!("EXIF:DateTimeOriginal" => "2000:01:01 12:00:00"),
    );

    assert_err!(record.set_gps_date_from_taken(), "time zone offset");
  }

  #[test]
  fn no_ops_without_taken_date() {
    let mut record = make_record("a.jpg", raw_tags!());

    assert!(!record.set_gps_date_from_taken().unwrap());
    assert!(!record.is_dirty());
  }

  #[test]
  fn derives_utc_gps_date() {
    let mut record = make_record(
      "a.jpg",
      raw_tags!(
        "EXIF:DateTimeOriginal" => "2000:01:01 02:00:00",
        "EXIF:OffsetTimeOriginal" => "+09:00",
      ),
    );

    assert!(record.set_gps_date_from_taken().unwrap());
    assert_eq!(
      record.get(LogicalField::GpsDate),
      Some(&FieldValue::Timestamp(make_date_naive(1999, 12, 31, 17, 0, 0)))
    );
  }
}

#[cfg(test)]
mod test_set_taken_date_from_file_ctime {
  use super::*;
  use crate::testing::*;

  #[test]
  fn fills_offset_from_default_zone() {
    let mut record = ImageMetadataRecord::from_raw_tags(
      "a.jpg".into(),
      raw_tags!(),
      0,
      Some(make_date_naive(2000, 1, 1, 12, 0, 0)),
    );

    record
      .set_taken_date_from_file_ctime(Some("Asia/Tokyo"))
      .unwrap();

    assert_eq!(record.taken_date(), Some(make_date_naive(2000, 1, 1, 12, 0, 0)));
    assert_eq!(record.tz_offset(), Some(FixedOffset::east_opt(9 * 3600).unwrap()));
    assert_eq!(
      record.get(LogicalField::GpsDate),
      Some(&FieldValue::Timestamp(make_date_naive(2000, 1, 1, 3, 0, 0)))
    );
  }

  #[test]
  fn errors_without_creation_time() {
    let mut record = make_record("a.jpg", raw_tags!());

    assert_err!(
      record.set_taken_date_from_file_ctime(None),
      "no file creation time"
    );
  }

  #[test]
  fn keeps_existing_offset() {
    let mut record = ImageMetadataRecord::from_raw_tags(
      "a.jpg".into(),
      raw_tags!("EXIF:OffsetTimeOriginal" => "-08:00"),
      0,
      Some(make_date_naive(2000, 1, 1, 12, 0, 0)),
    );

    record
      .set_taken_date_from_file_ctime(Some("Asia/Tokyo"))
      .unwrap();

    assert_eq!(record.tz_offset(), Some(FixedOffset::east_opt(-8 * 3600).unwrap()));
  }
}
