// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Tag reading and writing through `ExifTool`.
//!
//! The engine never parses image files itself; all tag access goes through
//! the `TagIo` trait. `ExifTool` is the production implementation, one
//! subprocess call per read or write set. Tests use the in-memory fake from
//! `crate::testing` instead.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use crate::error::Error;

/// Suffix `ExifTool` gives backup files, appended to the whole file name
/// (`photo.jpg` -> `photo.jpg_original`).
pub const BACKUP_SUFFIX: &str = "_original";

const EXIFTOOL_MIN_VERSION: (u32, u32) = (12, 0);

/// Read with ExifTool group names, numeric coordinates and UTF-8 IPTC.
const READ_ARGS: [&str; 5] = ["-j", "-G", "-n", "-charset", "iptc=utf8"];

/// One tag mutation: a new value, or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagWrite {
  Value(String),
  Delete,
}

/// External tag store collaborator.
pub trait TagIo {
  /// Reads all tags of `file` into a flat `GROUP:Tag -> value` dictionary.
  fn read_tags(&self, file: &Path) -> Result<BTreeMap<String, String>, Error>;

  /// Applies one set of tag mutations to `file` atomically from the
  /// engine's point of view: either all land or the record is unchanged.
  fn write_tags(&self, file: &Path, writes: &[(String, TagWrite)]) -> Result<(), Error>;

  /// Renames a file without touching its tags.
  fn rename(&self, old: &Path, new: &Path) -> Result<(), Error>;

  fn exists(&self, path: &Path) -> bool;
}

/// The sibling backup file `ExifTool` maintains next to an edited file.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
  let mut name = OsString::from(path.file_name().unwrap_or_default());
  name.push(BACKUP_SUFFIX);
  path.with_file_name(name)
}

/// `ExifTool` subprocess wrapper.
pub struct ExifTool {
  program:        PathBuf,
  create_backups: bool,
}

impl ExifTool {
  /// Locates `ExifTool` and checks its version. Failure here is a session
  /// error; nothing can run without the tool.
  pub fn new(create_backups: bool) -> Result<Self, Error> {
    let program = Self::locate()?;
    let tool = Self {
      program,
      create_backups,
    };

    version_check(&tool.run(["-ver"])?, EXIFTOOL_MIN_VERSION)?;
    Ok(tool)
  }

  fn locate() -> Result<PathBuf, Error> {
    let candidates = [
      PathBuf::from("exiftool"),
      PathBuf::from("/usr/bin/exiftool"),
      PathBuf::from("/usr/local/bin/exiftool"),
      PathBuf::from("/opt/homebrew/bin/exiftool"),
    ];

    for candidate in candidates {
      if Command::new(&candidate)
        .arg("-ver")
        .output()
        .is_ok_and(|o| o.status.success())
      {
        return Ok(candidate);
      }
    }
    Err(Error::Session("ExifTool not found on PATH".to_string()))
  }

  fn run<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(&self, args: I) -> Result<Vec<u8>, Error> {
    let mut cmd = Command::new(&self.program);
    cmd.args(args);

    let output = cmd
      .output()
      .map_err(|e| Error::ToolInvocation(format!("failed to run: {e}")))?;

    log::trace!("{}", String::from_utf8_lossy(&output.stdout));

    if !output.status.success() {
      return Err(Error::ToolInvocation(format!(
        "args: {}\nstderr: {}",
        cmd.get_args().collect::<Vec<_>>().join(OsStr::new(" ")).display(),
        String::from_utf8_lossy(&output.stderr)
      )));
    }

    Ok(output.stdout)
  }
}

impl TagIo for ExifTool {
  fn read_tags(&self, file: &Path) -> Result<BTreeMap<String, String>, Error> {
    let mut args = Vec::from(READ_ARGS.map(OsStr::new));
    args.push(file.as_os_str());

    parse_raw_tags(&self.run(args)?)
  }

  fn write_tags(&self, file: &Path, writes: &[(String, TagWrite)]) -> Result<(), Error> {
    if writes.is_empty() {
      return Ok(());
    }

    // `-P` keeps the file modify date stable across edits.
    let mut args = vec![
      OsString::from("-charset"),
      OsString::from("iptc=utf8"),
      OsString::from("-P"),
    ];
    if !self.create_backups {
      args.push(OsString::from("-overwrite_original"));
    }

    for (key, write) in writes {
      match write {
        TagWrite::Value(value) => args.push(OsString::from(format!("-{key}={value}"))),
        TagWrite::Delete => args.push(OsString::from(format!("-{key}="))),
      }
    }
    args.push(file.as_os_str().to_os_string());

    let stdout = self.run(args)?;
    if String::from_utf8_lossy(&stdout).contains("0 image files updated") {
      return Err(Error::ToolInvocation(format!(
        "{}: no tags written",
        file.display()
      )));
    }
    Ok(())
  }

  fn rename(&self, old: &Path, new: &Path) -> Result<(), Error> {
    fs::rename(old, new).map_err(|e| Error::RenameFailed {
      old:     old.to_path_buf(),
      new:     new.to_path_buf(),
      message: e.to_string(),
    })
  }

  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }
}

/// Parses `ExifTool`'s `-j -G` output for one file into a flat dictionary.
/// Array values are rejoined with the keyword storage delimiter, matching how
/// the engine writes them.
pub fn parse_raw_tags(stdout: &[u8]) -> Result<BTreeMap<String, String>, Error> {
  let parsed: Vec<BTreeMap<String, Value>> = serde_json::from_slice(stdout)
    .map_err(|e| Error::ToolInvocation(format!("unparsable JSON output ({e})")))?;

  let Some(entry) = parsed.into_iter().next() else {
    return Err(Error::ToolInvocation("empty JSON output".to_string()));
  };

  let mut tags = BTreeMap::new();
  for (key, value) in entry {
    if key == "SourceFile" {
      continue;
    }
    if let Some(value) = flatten_value(&value) {
      tags.insert(key, value);
    }
  }
  Ok(tags)
}

fn flatten_value(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(items) => Some(
      items
        .iter()
        .filter_map(flatten_value)
        .collect::<Vec<_>>()
        .join("*"),
    ),
    Value::Null | Value::Object(_) => None,
  }
}

/// Returns whether `version` (`ExifTool`'s `-ver` stdout) is at least
/// `version_required_min`.
fn version_check(version: &[u8], version_required_min: (u32, u32)) -> Result<(), Error> {
  let version = String::from_utf8_lossy(version);
  let Some((major, minor)) = version.trim().split_once('.') else {
    return Err(Error::Session(format!(
      "unexpected ExifTool version string \"{version}\""
    )));
  };

  let (Ok(major), Ok(minor)) = (major.parse::<u32>(), minor.parse::<u32>()) else {
    return Err(Error::Session(format!(
      "unexpected ExifTool version \"{version}\""
    )));
  };

  if major > version_required_min.0
    || (major == version_required_min.0 && minor >= version_required_min.1)
  {
    Ok(())
  } else {
    Err(Error::Session(format!(
      "ExifTool {major}.{minor} is older than required {}.{}",
      version_required_min.0, version_required_min.1
    )))
  }
}

#[cfg(test)]
mod test_backup_path {
  use super::*;

  #[test]
  fn appends_suffix_to_whole_file_name() {
    assert_eq!(
      backup_path(Path::new("/photos/a.jpg")),
      Path::new("/photos/a.jpg_original")
    );
  }
}
