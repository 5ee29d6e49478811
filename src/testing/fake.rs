// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! In-memory `TagIo` stand-in for `ExifTool`.
//!
//! Holds a tag dictionary per path and applies writes the way `ExifTool`
//! would: a write to a family-1 group key lands under the family-0 key the
//! next read reports. Individual paths can be set up to fail writes or
//! renames.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::io::{TagIo, TagWrite};
use crate::tags;

#[derive(Default)]
pub struct FakeTagIo {
  files:        RefCell<BTreeMap<PathBuf, BTreeMap<String, String>>>,
  fail_writes:  RefCell<BTreeSet<PathBuf>>,
  fail_renames: RefCell<BTreeSet<PathBuf>>,
}

impl FakeTagIo {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_file(&self, path: &str, tags: BTreeMap<String, String>) {
    self.files.borrow_mut().insert(path.into(), tags);
  }

  /// Next `write_tags` calls for `path` fail.
  pub fn fail_writes_for(&self, path: &str) {
    self.fail_writes.borrow_mut().insert(path.into());
  }

  /// Next `rename` calls from `path` fail.
  pub fn fail_renames_for(&self, path: &str) {
    self.fail_renames.borrow_mut().insert(path.into());
  }

  pub fn tags_of(&self, path: &str) -> BTreeMap<String, String> {
    self
      .files
      .borrow()
      .get(Path::new(path))
      .unwrap_or_else(|| panic!("{path}: not in fake store"))
      .clone()
  }

  pub fn paths(&self) -> Vec<PathBuf> {
    self.files.borrow().keys().cloned().collect()
  }
}

impl TagIo for FakeTagIo {
  fn read_tags(&self, file: &Path) -> Result<BTreeMap<String, String>, Error> {
    self
      .files
      .borrow()
      .get(file)
      .cloned()
      .ok_or_else(|| Error::ToolInvocation(format!("{}: not in fake store", file.display())))
  }

  fn write_tags(&self, file: &Path, writes: &[(String, TagWrite)]) -> Result<(), Error> {
    if self.fail_writes.borrow().contains(file) {
      return Err(Error::ToolInvocation(format!(
        "{}: write failure injected",
        file.display()
      )));
    }

    let mut files = self.files.borrow_mut();
    let Some(tags) = files.get_mut(file) else {
      return Err(Error::ToolInvocation(format!(
        "{}: not in fake store",
        file.display()
      )));
    };

    for (key, write) in writes {
      let read_key = tags::read_key_for(key);
      match write {
        TagWrite::Value(value) => {
          tags.insert(read_key, value.clone());
        }
        TagWrite::Delete => {
          tags.remove(&read_key);
        }
      }
    }
    Ok(())
  }

  fn rename(&self, old: &Path, new: &Path) -> Result<(), Error> {
    if self.fail_renames.borrow().contains(old) {
      return Err(Error::RenameFailed {
        old:     old.to_path_buf(),
        new:     new.to_path_buf(),
        message: "rename failure injected".to_string(),
      });
    }

    let mut files = self.files.borrow_mut();
    let Some(tags) = files.remove(old) else {
      return Err(Error::RenameFailed {
        old:     old.to_path_buf(),
        new:     new.to_path_buf(),
        message: "not in fake store".to_string(),
      });
    };
    files.insert(new.to_path_buf(), tags);
    Ok(())
  }

  fn exists(&self, path: &Path) -> bool {
    self.files.borrow().contains_key(path)
  }
}
