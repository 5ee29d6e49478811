// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Error kinds for the metadata engine.
//!
//! Parse failures on individual tags never surface here: the tag is treated
//! as absent and logged. Everything else is per-record (collected into a
//! `BatchResult`) or session-level (`ExifTool` missing at startup).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A tag value could not be parsed under its binding's rule.
  #[error("{tag}: cannot parse `{value}`")]
  TagParse { tag: &'static str, value: String },

  /// GPS date recompute was requested without a time zone offset.
  #[error("{}: cannot set GPS date without a time zone offset", .0.display())]
  MissingOffset(PathBuf),

  /// A keyword token contains the storage delimiter.
  #[error("keyword `{0}` contains the reserved delimiter `*`")]
  InvalidKeywordToken(String),

  /// The external tag tool failed or is missing.
  #[error("ExifTool failed ({0})")]
  ToolInvocation(String),

  /// A rename target already exists.
  #[error("{}: cannot rename to existing file {}", .old.display(), .new.display())]
  RenameConflict { old: PathBuf, new: PathBuf },

  /// Rename failed partway; the record's tags were not written.
  #[error("{}: rename to {} failed ({message})", .old.display(), .new.display())]
  RenameFailed {
    old:     PathBuf,
    new:     PathBuf,
    message: String,
  },

  /// Reverse geocoding failed. Treated as "no suggestion", never fatal.
  #[error("reverse geocoding failed ({0})")]
  GeoLookup(String),

  #[error("unknown time zone `{0}`")]
  UnknownTimeZone(String),

  #[error("{}: no file creation time available", .0.display())]
  MissingCreationTime(PathBuf),

  /// Startup-level failure, distinct from per-record errors.
  #[error("{0}")]
  Session(String),
}
