// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Batch application of field edits across a selection.
//!
//! One plan covers many records; each record gets exactly one rename and one
//! tag write set. Records fail independently: an error on one is collected
//! and the rest of the selection proceeds. A record's in-memory values and
//! dirty set only change after its write lands.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use chrono::FixedOffset;

use crate::error::Error;
use crate::io::{TagIo, TagWrite, backup_path};
use crate::prim::{FieldValue, ImageMetadataRecord, LogicalField, Selection};
use crate::tags;

/// One edit to a logical field. Setting and deleting are distinct: an empty
/// value never deletes, and a delete is never skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
  Set(FieldValue),
  Delete,
}

/// A set of field edits, and optionally a rename, to apply to every selected
/// record.
#[derive(Debug, Clone, Default)]
pub struct BatchEdits {
  fields: BTreeMap<LogicalField, FieldEdit>,
  rename: Option<OsString>,
}

impl BatchEdits {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, field: LogicalField, value: FieldValue) -> &mut Self {
    debug_assert!(value.matches(field.value_kind()));
    self.fields.insert(field, FieldEdit::Set(value));
    self
  }

  pub fn delete(&mut self, field: LogicalField) -> &mut Self {
    self.fields.insert(field, FieldEdit::Delete);
    self
  }

  /// Renames each record to `file_name` within its directory.
  pub fn rename(&mut self, file_name: impl Into<OsString>) -> &mut Self {
    self.rename = Some(file_name.into());
    self
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.fields.is_empty() && self.rename.is_none()
  }
}

/// Per-record outcomes, in selection order.
#[derive(Debug, Default)]
pub struct BatchResult {
  outcomes: Vec<(PathBuf, Result<(), Error>)>,
}

impl BatchResult {
  #[must_use]
  pub fn outcomes(&self) -> &[(PathBuf, Result<(), Error>)] {
    &self.outcomes
  }

  #[must_use]
  pub fn into_outcomes(self) -> Vec<(PathBuf, Result<(), Error>)> {
    self.outcomes
  }

  pub fn push(&mut self, path: PathBuf, outcome: Result<(), Error>) {
    self.outcomes.push((path, outcome));
  }

  #[must_use]
  pub fn is_ok(&self) -> bool {
    self.outcomes.iter().all(|(_, r)| r.is_ok())
  }

  pub fn errors(&self) -> impl Iterator<Item = (&PathBuf, &Error)> {
    self
      .outcomes
      .iter()
      .filter_map(|(p, r)| r.as_ref().err().map(|e| (p, e)))
  }
}

/// Applies `edits` to every selected record, flushing through `io`.
pub fn plan_and_apply(
  io: &dyn TagIo,
  records: &mut [ImageMetadataRecord],
  selection: &Selection,
  edits: &BatchEdits,
) -> BatchResult {
  let mut result = BatchResult::default();

  for &index in selection.indices() {
    let record = &mut records[index];
    let path = record.path().to_path_buf();
    let outcome = apply_to_record(io, record, edits);

    if let Err(e) = &outcome {
      log::error!("{e}");
    }
    result.outcomes.push((path, outcome));
  }
  result
}

fn apply_to_record(
  io: &dyn TagIo,
  record: &mut ImageMetadataRecord,
  edits: &BatchEdits,
) -> Result<(), Error> {
  // Rename first: a failed rename must leave the record's tags untouched.
  if let Some(file_name) = &edits.rename {
    rename_record(io, record, file_name.clone())?;
  }

  let mut writes = vec![];
  let mut applied = vec![];
  let offset = edit_offset(record, edits);

  for (&field, edit) in &edits.fields {
    match edit {
      FieldEdit::Set(value) => {
        // An empty value means "leave as is", never an overwrite.
        if value.is_empty() {
          log::debug!("{}: skipping empty {field:?}", record.path().display());
          continue;
        }
        for (key, formatted) in tags::resolve_write(field, value, offset) {
          writes.push((key, TagWrite::Value(formatted)));
        }
        applied.push((field, Some(value.clone())));
      }
      FieldEdit::Delete => {
        for key in tags::delete_keys(field) {
          writes.push((key, TagWrite::Delete));
        }
        applied.push((field, None));
      }
    }
  }

  io.write_tags(record.path(), &writes)?;

  for (field, value) in applied {
    match value {
      Some(value) => record.set(field, value),
      None => record.clear(field),
    }
  }
  record.clear_dirty();
  Ok(())
}

/// The offset appended to XMP date writes: the one being set in this batch,
/// else the record's stored one.
fn edit_offset(record: &ImageMetadataRecord, edits: &BatchEdits) -> Option<FixedOffset> {
  match edits.fields.get(&LogicalField::TzOffset) {
    Some(FieldEdit::Set(FieldValue::Offset(offset))) => Some(*offset),
    Some(FieldEdit::Delete) => None,
    _ => record.tz_offset(),
  }
}

/// Renames a record's file within its directory, carrying any `_original`
/// backup sibling along. If the backup cannot follow, the main rename is
/// rolled back.
fn rename_record(
  io: &dyn TagIo,
  record: &mut ImageMetadataRecord,
  file_name: OsString,
) -> Result<(), Error> {
  let old = record.path().to_path_buf();
  let new = old.with_file_name(file_name);
  if new == old {
    return Ok(());
  }

  if io.exists(&new) {
    return Err(Error::RenameConflict { old, new });
  }
  io.rename(&old, &new)?;

  let old_backup = backup_path(&old);
  if io.exists(&old_backup) {
    if let Err(e) = io.rename(&old_backup, &backup_path(&new)) {
      // Put the main file back so file and backup stay paired.
      if let Err(rollback) = io.rename(&new, &old) {
        log::error!("{rollback}");
      }
      return Err(e);
    }
  }

  log::info!("{} -> {}", old.display(), new.display());
  record.set_path(new);
  Ok(())
}

#[cfg(test)]
mod test_plan_and_apply {
  use super::*;
  use crate::testing::*;

  #[test]
  fn applies_in_selection_order_and_updates_records() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!());
    io.add_file("/p/b.jpg", raw_tags!());
    let mut records = vec![
      make_record("/p/a.jpg", raw_tags!()),
      make_record("/p/b.jpg", raw_tags!()),
    ];

    let mut edits = BatchEdits::new();
    edits.set(LogicalField::City, FieldValue::Text("Osaka".into()));
    let result = plan_and_apply(&io, &mut records, &Selection::new(vec![1, 0]), &edits);

    assert!(result.is_ok());
    assert_eq!(result.outcomes()[0].0, PathBuf::from("/p/b.jpg"));
    assert_eq!(result.outcomes()[1].0, PathBuf::from("/p/a.jpg"));
    for record in &records {
      assert_eq!(record.get(LogicalField::City), Some(&FieldValue::Text("Osaka".into())));
      assert!(!record.is_dirty());
    }
    assert_eq!(io.tags_of("/p/a.jpg").get("XMP:City"), Some(&"Osaka".to_string()));
    assert_eq!(io.tags_of("/p/a.jpg").get("IPTC:City"), Some(&"Osaka".to_string()));
  }

  #[test]
  fn empty_value_keeps_existing() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!("XMP:City" => "Osaka"));
    let mut records = vec![make_record("/p/a.jpg", raw_tags!("XMP:City" => "Osaka"))];

    let mut edits = BatchEdits::new();
    edits.set(LogicalField::City, FieldValue::Text(String::new()));
    let result = plan_and_apply(&io, &mut records, &Selection::new(vec![0]), &edits);

    assert!(result.is_ok());
    assert_eq!(io.tags_of("/p/a.jpg").get("XMP:City"), Some(&"Osaka".to_string()));
    assert_eq!(
      records[0].get(LogicalField::City),
      Some(&FieldValue::Text("Osaka".into()))
    );
  }

  #[test]
  fn delete_fans_out_to_all_bound_tags() {
    let io = FakeTagIo::new();
    io.add_file(
      "/p/a.jpg",
      raw_tags!("IPTC:Keywords" => "beach", "XMP:Subject" => "beach"),
    );
    let mut records = vec![make_record("/p/a.jpg", raw_tags!("IPTC:Keywords" => "beach"))];

    let mut edits = BatchEdits::new();
    edits.delete(LogicalField::Keywords);
    let result = plan_and_apply(&io, &mut records, &Selection::new(vec![0]), &edits);

    assert!(result.is_ok());
    let tags = io.tags_of("/p/a.jpg");
    assert!(!tags.contains_key("IPTC:Keywords"));
    assert!(!tags.contains_key("XMP:Subject"));
    assert!(records[0].get(LogicalField::Keywords).is_none());
  }

  #[test]
  fn batch_offset_lands_in_xmp_dates() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!());
    let mut records = vec![make_record("/p/a.jpg", raw_tags!())];

    let mut edits = BatchEdits::new();
    edits.set(
      LogicalField::TakenDate,
      FieldValue::Timestamp(make_date_naive(2000, 1, 1, 12, 0, 0)),
    );
    edits.set(
      LogicalField::TzOffset,
      FieldValue::Offset(FixedOffset::east_opt(9 * 3600).unwrap()),
    );
    let result = plan_and_apply(&io, &mut records, &Selection::new(vec![0]), &edits);

    assert!(result.is_ok());
    assert_eq!(
      io.tags_of("/p/a.jpg").get("XMP:DateTimeOriginal"),
      Some(&"2000:01:01 12:00:00+09:00".to_string())
    );
    assert_eq!(
      io.tags_of("/p/a.jpg").get("EXIF:DateTimeOriginal"),
      Some(&"2000:01:01 12:00:00".to_string())
    );
  }

  #[test]
  fn per_record_failure_isolation() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!());
    io.add_file("/p/b.jpg", raw_tags!());
    io.fail_writes_for("/p/a.jpg");
    let mut records = vec![
      make_record("/p/a.jpg", raw_tags!()),
      make_record("/p/b.jpg", raw_tags!()),
    ];

    let mut edits = BatchEdits::new();
    edits.set(LogicalField::City, FieldValue::Text("Osaka".into()));
    let result = plan_and_apply(&io, &mut records, &Selection::new(vec![0, 1]), &edits);

    assert!(!result.is_ok());
    assert_eq!(result.errors().count(), 1);
    assert!(records[0].get(LogicalField::City).is_none());
    assert_eq!(
      records[1].get(LogicalField::City),
      Some(&FieldValue::Text("Osaka".into()))
    );
  }
}
