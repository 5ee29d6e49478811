// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Keyword set with the `*`-joined storage convention.
//!
//! Keywords live in `IPTC:Keywords`/`XMP-dc:Subject` as one string joined
//! with `*`; display and user input use `;`. Tokens are trimmed, order of
//! first appearance is kept, and duplicates collapse.

use crate::error::Error;

pub const STORAGE_SEPARATOR: char = '*';
pub const DISPLAY_SEPARATOR: char = ';';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
  tokens: Vec<String>,
}

impl KeywordSet {
  /// Parses the `*`-joined storage form. Empty tokens are dropped.
  #[must_use]
  pub fn from_storage(value: &str) -> Self {
    Self::from_separated(value, STORAGE_SEPARATOR)
  }

  /// Parses the `;`-separated display/input form.
  #[must_use]
  pub fn from_display(value: &str) -> Self {
    Self::from_separated(value, DISPLAY_SEPARATOR)
  }

  fn from_separated(value: &str, separator: char) -> Self {
    let mut set = Self::default();
    for token in value.split(separator) {
      let token = token.trim();
      if !token.is_empty() && !set.tokens.iter().any(|t| t == token) {
        set.tokens.push(token.to_string());
      }
    }
    set
  }

  #[must_use]
  pub fn to_storage(&self) -> String {
    self.tokens.join(&STORAGE_SEPARATOR.to_string())
  }

  #[must_use]
  pub fn to_display(&self) -> String {
    self.tokens.join("; ")
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  #[must_use]
  pub fn contains(&self, token: &str) -> bool {
    self.tokens.iter().any(|t| t == token)
  }

  #[must_use]
  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  /// Appends a token unless already present. Errors if the token contains the
  /// storage delimiter, which cannot survive a round trip.
  pub fn insert(&mut self, token: &str) -> Result<bool, Error> {
    let token = token.trim();
    if token.contains(STORAGE_SEPARATOR) {
      return Err(Error::InvalidKeywordToken(token.to_string()));
    }
    if token.is_empty() || self.contains(token) {
      return Ok(false);
    }
    self.tokens.push(token.to_string());
    Ok(true)
  }

  /// Removes a token if present.
  pub fn remove(&mut self, token: &str) -> bool {
    let before = self.tokens.len();
    self.tokens.retain(|t| t != token);
    self.tokens.len() != before
  }
}

/// Adds the country code and country name to a keyword set, skipping what is
/// already there. Idempotent.
pub fn merge_country_keywords(
  keywords: &mut KeywordSet,
  country_code: Option<&str>,
  country_name: Option<&str>,
) -> Result<bool, Error> {
  let mut changed = false;
  for token in [country_code, country_name].into_iter().flatten() {
    changed |= keywords.insert(token)?;
  }
  Ok(changed)
}

/// Removes the country code and country name from a keyword set, leaving
/// other keywords untouched.
pub fn remove_country_keywords(
  keywords: &mut KeywordSet,
  country_code: Option<&str>,
  country_name: Option<&str>,
) -> bool {
  let mut changed = false;
  for token in [country_code, country_name].into_iter().flatten() {
    changed |= keywords.remove(token);
  }
  changed
}

#[cfg(test)]
mod test_round_trip {
  use super::*;

  #[test]
  fn display_and_storage_forms_are_lossless() {
    let set = KeywordSet::from_display("beach; sunset ;Japan");

    assert_eq!(set.to_display(), "beach; sunset; Japan");
    assert_eq!(set.to_storage(), "beach*sunset*Japan");
    assert_eq!(KeywordSet::from_storage(&set.to_storage()), set);
  }

  #[test]
  fn drops_empty_tokens_and_duplicates() {
    let set = KeywordSet::from_storage("beach**beach* *sunset");

    assert_eq!(set.tokens(), ["beach", "sunset"]);
  }

  #[test]
  fn empty_string_parses_to_empty_set() {
    assert!(KeywordSet::from_storage("").is_empty());
    assert!(KeywordSet::from_display("  ").is_empty());
  }
}

#[cfg(test)]
mod test_insert {
  use super::*;
  use crate::testing::*;

  #[test]
  fn keeps_first_appearance_order() {
    let mut set = KeywordSet::default();
    set.insert("b").unwrap();
    set.insert("a").unwrap();
    set.insert("b").unwrap();

    assert_eq!(set.tokens(), ["b", "a"]);
  }

  #[test]
  fn rejects_token_with_storage_delimiter() {
    let mut set = KeywordSet::default();

    assert_err!(set.insert("a*b"), "reserved delimiter");
    assert!(set.is_empty());
  }
}
