// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Directory session: scanning, the active marker, and the engine
//! operations that run over a selection.
//!
//! One session owns one directory's records. All tag access is serialized
//! through the session's `TagIo`; records are only reachable through `&mut
//! self`, so a record being flushed cannot be edited concurrently.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::{fs, io as std_io};

use chrono::{DateTime, Local, NaiveDateTime};

use crate::batch::{BatchEdits, BatchResult, plan_and_apply};
use crate::config::Config;
use crate::error::Error;
use crate::geocode::{GeoLookup, lookup_or_none, normalize_country_code};
use crate::io::TagIo;
use crate::prim::{
  FieldValue, ImageMetadataRecord, LogicalField, Selection, conv, merge_country_keywords,
};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

const GEOCODE_TIMEOUT_MS: u64 = 10_000;

/// The map position edits are taken from. Placed explicitly; never moves on
/// its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveMarker {
  pub latitude:  f64,
  pub longitude: f64,
}

pub type Progress<'p> = &'p mut dyn FnMut(usize, usize, &Path);

pub struct Session<'a> {
  io:      &'a dyn TagIo,
  config:  Config,
  records: Vec<ImageMetadataRecord>,
  marker:  Option<ActiveMarker>,
}

impl<'a> Session<'a> {
  /// Scans `dir` for supported files and loads a record per file.
  pub fn scan(
    io: &'a dyn TagIo,
    config: Config,
    dir: &Path,
    cancel: &AtomicBool,
    progress: Progress<'_>,
  ) -> Result<Self, Error> {
    let paths = list_supported_files(dir)
      .map_err(|e| Error::Session(format!("{}: cannot scan ({e})", dir.display())))?;

    log::info!("{}: scanning {} files", dir.display(), paths.len());
    Ok(Self::load(io, config, paths, cancel, progress))
  }

  /// Loads records for `paths`, in order. Cancellation is checked between
  /// files; a file that fails to read is skipped with an error logged.
  pub fn load(
    io: &'a dyn TagIo,
    config: Config,
    paths: Vec<PathBuf>,
    cancel: &AtomicBool,
    progress: Progress<'_>,
  ) -> Self {
    let total = paths.len();
    let mut records = vec![];

    for (i, path) in paths.into_iter().enumerate() {
      if cancel.load(Ordering::Relaxed) {
        log::info!("scan cancelled after {i} of {total} files");
        break;
      }
      progress(i + 1, total, &path);

      let raw_tags = match io.read_tags(&path) {
        Ok(raw_tags) => raw_tags,
        Err(e) => {
          log::error!("{e}");
          continue;
        }
      };

      let (size, ctime) = file_facts(&path);
      let record = ImageMetadataRecord::from_raw_tags(path, raw_tags, size, ctime);

      if record.created_date_was_derived() {
        persist_derived_created_date(io, &record);
      }
      records.push(record);
    }

    Self {
      io,
      config,
      records,
      marker: None,
    }
  }

  #[must_use]
  pub fn records(&self) -> &[ImageMetadataRecord] {
    &self.records
  }

  #[must_use]
  pub fn config(&self) -> &Config {
    &self.config
  }

  #[must_use]
  pub fn marker(&self) -> Option<ActiveMarker> {
    self.marker
  }

  pub fn place_marker(&mut self, latitude: f64, longitude: f64) {
    self.marker = Some(ActiveMarker {
      latitude,
      longitude,
    });
  }

  /// Applies one explicit edit set across a selection.
  pub fn apply(&mut self, selection: &Selection, edits: &BatchEdits) -> BatchResult {
    plan_and_apply(self.io, &mut self.records, selection, edits)
  }

  /// Writes the active marker's position into every selected record, with
  /// reverse-geocoded location names and keywords when a lookup is given.
  pub fn geotag(&mut self, selection: &Selection, geo: Option<&dyn GeoLookup>) -> BatchResult {
    let Some(marker) = self.marker else {
      return selection_error(selection, &self.records, || {
        Error::Session("no marker placed".to_string())
      });
    };

    let looked_up = geo
      .and_then(|geo| lookup_or_none(geo, marker.latitude, marker.longitude, GEOCODE_TIMEOUT_MS))
      .map(|mut place| {
        // Tags only ever hold alpha-3 codes; lookups may return alpha-2.
        place.country_code = place.country_code.as_deref().map(normalize_country_code);
        place
      });

    let mut result = BatchResult::default();
    for &index in selection.indices() {
      let record = &mut self.records[index];
      record.set(LogicalField::Latitude, FieldValue::Degrees(marker.latitude));
      record.set(LogicalField::Longitude, FieldValue::Degrees(marker.longitude));

      if let Some(place) = &looked_up {
        for (field, value) in [
          (LogicalField::Country, &place.country),
          (LogicalField::CountryCode, &place.country_code),
          (LogicalField::City, &place.city),
        ] {
          if let Some(value) = value {
            record.set(field, FieldValue::Text(value.clone()));
          }
        }

        let mut keywords = record.keywords();
        match merge_country_keywords(
          &mut keywords,
          place.country_code.as_deref(),
          place.country.as_deref(),
        ) {
          Ok(true) => record.set(LogicalField::Keywords, FieldValue::Set(keywords)),
          Ok(false) => {}
          Err(e) => {
            log::error!("{e}");
            result.push(record.path().to_path_buf(), Err(e));
            continue;
          }
        }
      }

      flush_record(self.io, record, &mut result);
    }
    result
  }

  /// Sets each selected record's offset from an IANA zone, using the
  /// record's taken date to resolve DST. Records without a taken date are
  /// skipped.
  pub fn set_zone(&mut self, selection: &Selection, zone: &str) -> BatchResult {
    let mut result = BatchResult::default();
    for &index in selection.indices() {
      let record = &mut self.records[index];
      let Some(taken) = record.taken_date() else {
        log::warn!("{}: no taken date, skipping", record.path().display());
        result.push(record.path().to_path_buf(), Ok(()));
        continue;
      };

      match conv::offset_for(&taken, zone) {
        Ok(offset) => {
          record.set_tz_offset(offset);
          flush_record(self.io, record, &mut result);
        }
        Err(e) => {
          log::error!("{e}");
          result.push(record.path().to_path_buf(), Err(e));
        }
      }
    }
    result
  }

  /// As `set_zone`, with the zone looked up from each record's coordinates.
  pub fn set_zone_from_position(&mut self, selection: &Selection) -> BatchResult {
    let mut result = BatchResult::default();
    for &index in selection.indices() {
      let record = &mut self.records[index];
      let (Some(lat), Some(lon)) = (record.latitude(), record.longitude()) else {
        log::warn!("{}: no coordinates, skipping", record.path().display());
        result.push(record.path().to_path_buf(), Ok(()));
        continue;
      };
      let Some(taken) = record.taken_date() else {
        log::warn!("{}: no taken date, skipping", record.path().display());
        result.push(record.path().to_path_buf(), Ok(()));
        continue;
      };
      let Some(zone) = conv::zone_for_position(lat, lon) else {
        result.push(
          record.path().to_path_buf(),
          Err(Error::UnknownTimeZone(format!("({lat}, {lon})"))),
        );
        continue;
      };

      match conv::offset_for(&taken, zone) {
        Ok(offset) => {
          record.set_tz_offset(offset);
          flush_record(self.io, record, &mut result);
        }
        Err(e) => {
          log::error!("{e}");
          result.push(record.path().to_path_buf(), Err(e));
        }
      }
    }
    result
  }

  /// Recomputes each selected record's GPS date from its taken date and
  /// stored offset.
  pub fn set_gps_date(&mut self, selection: &Selection) -> BatchResult {
    let mut result = BatchResult::default();
    for &index in selection.indices() {
      let record = &mut self.records[index];
      match record.set_gps_date_from_taken() {
        Ok(true) => flush_record(self.io, record, &mut result),
        Ok(false) => {
          log::warn!("{}: no taken date, skipping", record.path().display());
          result.push(record.path().to_path_buf(), Ok(()));
        }
        Err(e) => {
          log::error!("{e}");
          result.push(record.path().to_path_buf(), Err(e));
        }
      }
    }
    result
  }

  /// Fills each selected record's taken date from the file's creation time,
  /// for files with no capture metadata.
  pub fn set_taken_date_from_ctime(&mut self, selection: &Selection) -> BatchResult {
    let default_zone = self.config.default_timezone.clone();
    let mut result = BatchResult::default();
    for &index in selection.indices() {
      let record = &mut self.records[index];
      match record.set_taken_date_from_file_ctime(default_zone.as_deref()) {
        Ok(()) => flush_record(self.io, record, &mut result),
        Err(e) => {
          log::error!("{e}");
          result.push(record.path().to_path_buf(), Err(e));
        }
      }
    }
    result
  }
}

/// Flushes a record's dirty fields as one batch write.
fn flush_record(io: &dyn TagIo, record: &mut ImageMetadataRecord, result: &mut BatchResult) {
  let mut edits = BatchEdits::new();
  for &field in record.dirty_fields() {
    match record.get(field) {
      // An emptied value (say, a keyword set with its last token removed)
      // must reach the file as a delete; an empty Set would be skipped.
      Some(value) if !value.is_empty() => edits.set(field, value.clone()),
      _ => edits.delete(field),
    };
  }
  if edits.is_empty() {
    result.push(record.path().to_path_buf(), Ok(()));
    return;
  }

  let flushed = plan_and_apply(io, std::slice::from_mut(record), &Selection::new(vec![0]), &edits);
  for (path, outcome) in flushed.into_outcomes() {
    result.push(path, outcome);
  }
}

fn selection_error(
  selection: &Selection,
  records: &[ImageMetadataRecord],
  make: impl Fn() -> Error,
) -> BatchResult {
  let mut result = BatchResult::default();
  for &index in selection.indices() {
    result.push(records[index].path().to_path_buf(), Err(make()));
  }
  result
}

/// Supported files directly under `dir`, sorted by name.
pub fn list_supported_files(dir: &Path) -> Result<Vec<PathBuf>, std_io::Error> {
  let mut paths = vec![];
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() && is_supported(&path) {
      paths.push(path);
    }
  }
  paths.sort();
  Ok(paths)
}

fn is_supported(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// File size and creation time, best effort. Creation time falls back to the
/// modify time on filesystems without one.
fn file_facts(path: &Path) -> (u64, Option<NaiveDateTime>) {
  let Ok(metadata) = fs::metadata(path) else {
    return (0, None);
  };

  let ctime = metadata
    .created()
    .or_else(|_| metadata.modified())
    .ok()
    .map(|t| DateTime::<Local>::from(t).naive_local());

  (metadata.len(), ctime)
}

/// A created date derived at load is written back so other tools see it.
/// Best effort: failure only logs.
fn persist_derived_created_date(io: &dyn TagIo, record: &ImageMetadataRecord) {
  let Some(value) = record.get(LogicalField::CreatedDate) else {
    return;
  };

  let writes = crate::tags::resolve_write(LogicalField::CreatedDate, value, record.tz_offset())
    .into_iter()
    .map(|(key, formatted)| (key, crate::io::TagWrite::Value(formatted)))
    .collect::<Vec<_>>();

  log::debug!("{}: persisting derived created date", record.path().display());
  if let Err(e) = io.write_tags(record.path(), &writes) {
    log::warn!("{e}");
  }
}


#[cfg(test)]
mod test_is_supported {
  use super::*;

  #[test]
  fn extension_match_is_case_insensitive() {
    assert!(is_supported(Path::new("/p/a.JPG")));
    assert!(is_supported(Path::new("/p/a.jpeg")));
    assert!(is_supported(Path::new("/p/a.png")));
  }

  #[test]
  fn other_extensions_are_skipped() {
    assert!(!is_supported(Path::new("/p/a.cr2")));
    assert!(!is_supported(Path::new("/p/a")));
  }
}



#[cfg(test)]
mod test_set_gps_date {
  use super::*;
  use crate::testing::*;

  #[test]
  fn missing_offset_is_a_per_record_error() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!("EXIF:DateTimeOriginal" => "2000:01:01 12:00:00"));
    io.add_file(
      "/p/b.jpg",
      raw_tags!(
        "EXIF:DateTimeOriginal" => "2000:01:01 12:00:00",
        "EXIF:OffsetTime" => "+09:00",
      ),
    );
    let mut session = Session::load(
      &io,
      Config::default(),
      vec!["/p/a.jpg".into(), "/p/b.jpg".into()],
      &AtomicBool::new(false),
      &mut |_, _, _| {},
    );

    let result = session.set_gps_date(&Selection::new(vec![0, 1]));

    assert_eq!(result.errors().count(), 1);
    assert_eq!(
      io.tags_of("/p/b.jpg").get("EXIF:GPSDateStamp"),
      Some(&"2000:01:01".to_string())
    );
  }

  #[test]
  fn no_taken_date_is_skipped_without_error() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!());
    let mut session = Session::load(
      &io,
      Config::default(),
      vec!["/p/a.jpg".into()],
      &AtomicBool::new(false),
      &mut |_, _, _| {},
    );

    let result = session.set_gps_date(&Selection::new(vec![0]));

    assert!(result.is_ok());
    assert!(!io.tags_of("/p/a.jpg").contains_key("EXIF:GPSDateStamp"));
  }
}


#[cfg(test)]
mod test_apply {
  use super::*;
  use crate::testing::*;

  #[test]
  fn rename_edit_moves_file_backup_and_record() {
    let io = FakeTagIo::new();
    io.add_file("/p/a.jpg", raw_tags!());
    io.add_file("/p/a.jpg_original", raw_tags!());
    let mut session = Session::load(
      &io,
      Config::default(),
      vec!["/p/a.jpg".into()],
      &AtomicBool::new(false),
      &mut |_, _, _| {},
    );

    let mut edits = BatchEdits::new();
    edits.rename("b.jpg");
    let result = session.apply(&Selection::new(vec![0]), &edits);

    assert!(result.is_ok());
    assert!(io.exists(Path::new("/p/b.jpg")));
    assert!(io.exists(Path::new("/p/b.jpg_original")));
    assert!(!io.exists(Path::new("/p/a.jpg")));
    assert_eq!(session.records()[0].path(), Path::new("/p/b.jpg"));
  }
}
