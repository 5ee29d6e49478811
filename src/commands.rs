// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Program subcommands for keeping photo metadata consistent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::batch::{BatchEdits, BatchResult};
use crate::config::Config;
use crate::error::Error;
use crate::io::ExifTool;
use crate::prim::{FieldValue, LogicalField, Selection, conv};
use crate::rank::{DEFAULT_SUGGESTION_LIMIT, LocationCandidate, LocationScorer, rank};
use crate::scan::Session;

/// Lists each photo's resolved metadata.
pub fn scan(dir: &Path) -> Result<(), Error> {
  let (session, selection) = load_session(dir)?;

  for &index in selection.indices() {
    let record = &session.records()[index];
    let taken = record
      .taken_date()
      .map_or_else(|| "-".to_string(), |t| conv::format_exif_date_time(&t));
    let offset = record.tz_offset().map_or_else(|| "-".to_string(), conv::format_offset);
    let position = match (record.latitude(), record.longitude()) {
      (Some(lat), Some(lon)) => format!("({lat}, {lon})"),
      _ => "-".to_string(),
    };
    let city = match record.get(LogicalField::City) {
      Some(FieldValue::Text(city)) => city.clone(),
      _ => "-".to_string(),
    };

    log::info!("{}\t{taken}\t{offset}\t{position}\t{city}", record.path().display());
  }
  Ok(())
}

/// Writes a GPS position into every photo in the directory.
pub fn geotag(dir: &Path, latitude: f64, longitude: f64) -> Result<(), Error> {
  let (mut session, selection) = load_session(dir)?;

  session.place_marker(latitude, longitude);
  report(&session.geotag(&selection, None))
}

/// Sets the time zone offset from a named zone, or from each photo's
/// coordinates when no zone is given.
pub fn offset(dir: &Path, zone: Option<&str>) -> Result<(), Error> {
  let (mut session, selection) = load_session(dir)?;

  let result = match zone {
    Some(zone) => session.set_zone(&selection, zone),
    None => session.set_zone_from_position(&selection),
  };
  report(&result)
}

/// Recomputes GPS timestamps from taken dates and stored offsets.
pub fn gps_date(dir: &Path) -> Result<(), Error> {
  let (mut session, selection) = load_session(dir)?;

  report(&session.set_gps_date(&selection))
}

/// Fills taken dates from file creation times, for photos with no capture
/// metadata.
pub fn taken_date(dir: &Path) -> Result<(), Error> {
  let (mut session, selection) = load_session(dir)?;

  report(&session.set_taken_date_from_ctime(&selection))
}

/// Renames one photo within the directory, carrying any `_original` backup
/// sibling along.
pub fn rename(dir: &Path, file: &str, new_name: &str) -> Result<(), Error> {
  let (mut session, _) = load_session(dir)?;

  let index = session
    .records()
    .iter()
    .position(|r| r.path().file_name() == Some(std::ffi::OsStr::new(file)))
    .ok_or_else(|| Error::Session(format!("{}: no file named {file}", dir.display())))?;

  let mut edits = BatchEdits::new();
  edits.rename(new_name);
  report(&session.apply(&Selection::new(vec![index]), &edits))
}

/// Prints ranked location suggestions from an external scorer's candidate
/// file, for photos that have no position yet.
pub fn suggest(dir: &Path, candidates: &Path) -> Result<(), Error> {
  let (session, selection) = load_session(dir)?;
  let scorer = CandidateFile::load(candidates)?;
  let threshold = session.config().similarity_threshold;

  for &index in selection.indices() {
    let record = &session.records()[index];
    if record.latitude().is_some() && record.longitude().is_some() {
      continue;
    }

    let mut candidates = scorer.score(record.path())?;
    candidates.retain(|c| c.confidence >= threshold);
    let ranked = rank(candidates, DEFAULT_SUGGESTION_LIMIT);

    if ranked.is_empty() {
      log::info!("{}: no suggestions", record.path().display());
      continue;
    }
    for candidate in ranked {
      log::info!(
        "{}\t({}, {})\t{:.2}\t{}",
        record.path().display(),
        candidate.latitude,
        candidate.longitude,
        candidate.confidence,
        candidate.place_name.as_deref().unwrap_or("-")
      );
    }
  }
  Ok(())
}

/// Location candidates per photo path, exported by an external scorer as a
/// JSON object.
struct CandidateFile {
  by_path: BTreeMap<PathBuf, Vec<LocationCandidate>>,
}

impl CandidateFile {
  fn load(path: &Path) -> Result<Self, Error> {
    let bytes = fs::read(path)
      .map_err(|e| Error::Session(format!("{}: cannot read candidates ({e})", path.display())))?;
    let by_path = serde_json::from_slice(&bytes)
      .map_err(|e| Error::Session(format!("{}: malformed candidates ({e})", path.display())))?;
    Ok(Self { by_path })
  }
}

impl LocationScorer for CandidateFile {
  fn score(&self, path: &Path) -> Result<Vec<LocationCandidate>, Error> {
    Ok(self.by_path.get(path).cloned().unwrap_or_default())
  }
}

fn load_session(dir: &Path) -> Result<(Session<'static>, Selection), Error> {
  let mut config = Config::load();
  let io = ExifTool::new(config.create_backups)?;
  // The session borrows the tool for the rest of the program.
  let io: &'static ExifTool = Box::leak(Box::new(io));

  let cancel = AtomicBool::new(false);
  let mut progress =
    |i: usize, n: usize, path: &Path| log::debug!("[{i}/{n}] {}", path.display());
  let session = Session::scan(io, config.clone(), dir, &cancel, &mut progress)?;

  config.last_directory = Some(dir.to_path_buf());
  if let Err(e) = config.save() {
    log::warn!("{e}");
  }

  let selection = Selection::new((0..session.records().len()).collect());
  Ok((session, selection))
}

fn report(result: &BatchResult) -> Result<(), Error> {
  let failed = result.errors().count();
  let total = result.outcomes().len();

  if failed == 0 {
    log::info!("{total} files updated");
    Ok(())
  } else {
    Err(Error::Session(format!("{failed} of {total} files failed")))
  }
}
