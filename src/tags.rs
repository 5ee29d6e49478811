// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Mapping between logical fields and physical EXIF/XMP/IPTC tags.
//!
//! Reads walk a field's bindings in priority order (EXIF, then XMP, then
//! IPTC) and take the first value that parses; an unparsable tag logs a
//! warning and is skipped. Writes fan one value out to every bound tag, each
//! formatted per its binding. Deletes fan out the same way.
//!
//! Read keys use ExifTool's family-0 group names as they appear in `-j -G`
//! output; write keys pin the exact family-1 group so a write lands in one
//! namespace.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDateTime};

use crate::prim::{FieldValue, KeywordSet, LogicalField, conv};

/// How one tag encodes its field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
  Text,
  /// Signed decimal degrees.
  Degrees,
  /// Unsigned degrees with the hemisphere in a sibling ref tag.
  DegreesWithRef {
    ref_key:  &'static str,
    negative: &'static str,
  },
  /// Hemisphere letter derived from the coordinate's sign. Write-only.
  HemisphereRef {
    negative: &'static str,
    positive: &'static str,
  },
  /// `YYYY:MM:DD HH:MM:SS`, no offset.
  DateTime,
  /// As `DateTime`, with `±HH:MM` appended on write when the offset is known.
  DateTimeWithOffset,
  /// `YYYY:MM:DD`; the time of day lives in the sibling `GPSTimeStamp`.
  GpsDateStamp,
  /// `HH:MM:SS` UTC. Write-only; reads go through `GpsDateStamp`.
  GpsTimeStamp,
  /// Combined UTC date & time with a trailing `Z`.
  GpsDateTime,
  /// `±HH:MM`.
  OffsetColon,
  /// Fractional hours, possibly two values.
  OffsetHours,
  /// All keywords joined with the storage delimiter.
  Keywords,
}

struct Binding {
  read_key:  Option<&'static str>,
  write_key: Option<&'static str>,
  rule:      Rule,
}

const fn rw(read_key: &'static str, write_key: &'static str, rule: Rule) -> Binding {
  Binding {
    read_key: Some(read_key),
    write_key: Some(write_key),
    rule,
  }
}

const fn ro(read_key: &'static str, rule: Rule) -> Binding {
  Binding {
    read_key: Some(read_key),
    write_key: None,
    rule,
  }
}

const fn wo(write_key: &'static str, rule: Rule) -> Binding {
  Binding {
    read_key: None,
    write_key: Some(write_key),
    rule,
  }
}

#[rustfmt::skip]
fn bindings(field: LogicalField) -> &'static [Binding] {
  match field {
    LogicalField::TakenDate => const { &[
      rw("EXIF:DateTimeOriginal", "EXIF:DateTimeOriginal", Rule::DateTime),
      rw("XMP:DateTimeOriginal", "XMP-exif:DateTimeOriginal", Rule::DateTimeWithOffset),
    ] },
    LogicalField::CreatedDate => const { &[
      rw("EXIF:CreateDate", "EXIF:CreateDate", Rule::DateTime),
      rw("XMP:DateTimeDigitized", "XMP-exif:DateTimeDigitized", Rule::DateTimeWithOffset),
    ] },
    LogicalField::GpsDate => const { &[
      rw("EXIF:GPSDateStamp", "EXIF:GPSDateStamp", Rule::GpsDateStamp),
      wo("EXIF:GPSTimeStamp", Rule::GpsTimeStamp),
      rw("XMP:GPSDateTime", "XMP-exif:GPSDateTime", Rule::GpsDateTime),
    ] },
    LogicalField::TzOffset => const { &[
      rw("EXIF:OffsetTimeOriginal", "EXIF:OffsetTimeOriginal", Rule::OffsetColon),
      rw("EXIF:OffsetTime", "EXIF:OffsetTime", Rule::OffsetColon),
      rw("EXIF:OffsetTimeDigitized", "EXIF:OffsetTimeDigitized", Rule::OffsetColon),
      rw("EXIF:TimeZoneOffset", "EXIF:TimeZoneOffset", Rule::OffsetHours),
    ] },
    LogicalField::Latitude => const { &[
      ro("Composite:GPSLatitude", Rule::Degrees),
      rw("EXIF:GPSLatitude", "EXIF:GPSLatitude",
        Rule::DegreesWithRef { ref_key: "EXIF:GPSLatitudeRef", negative: "S" }),
      wo("EXIF:GPSLatitudeRef", Rule::HemisphereRef { negative: "S", positive: "N" }),
      rw("XMP:GPSLatitude", "XMP-exif:GPSLatitude", Rule::Degrees),
    ] },
    LogicalField::Longitude => const { &[
      ro("Composite:GPSLongitude", Rule::Degrees),
      rw("EXIF:GPSLongitude", "EXIF:GPSLongitude",
        Rule::DegreesWithRef { ref_key: "EXIF:GPSLongitudeRef", negative: "W" }),
      wo("EXIF:GPSLongitudeRef", Rule::HemisphereRef { negative: "W", positive: "E" }),
      rw("XMP:GPSLongitude", "XMP-exif:GPSLongitude", Rule::Degrees),
    ] },
    LogicalField::Country => const { &[
      rw("XMP:Country", "XMP-photoshop:Country", Rule::Text),
      rw("IPTC:Country-PrimaryLocationName", "IPTC:Country-PrimaryLocationName", Rule::Text),
    ] },
    LogicalField::CountryCode => const { &[
      rw("XMP:CountryCode", "XMP-iptcCore:CountryCode", Rule::Text),
      rw("IPTC:Country-PrimaryLocationCode", "IPTC:Country-PrimaryLocationCode", Rule::Text),
    ] },
    LogicalField::City => const { &[
      rw("XMP:City", "XMP-photoshop:City", Rule::Text),
      rw("IPTC:City", "IPTC:City", Rule::Text),
    ] },
    LogicalField::Sublocation => const { &[
      rw("XMP:Location", "XMP-iptcCore:Location", Rule::Text),
      rw("IPTC:Sub-location", "IPTC:Sub-location", Rule::Text),
    ] },
    LogicalField::Headline => const { &[
      rw("XMP:Headline", "XMP-photoshop:Headline", Rule::Text),
      rw("IPTC:Headline", "IPTC:Headline", Rule::Text),
    ] },
    LogicalField::Keywords => const { &[
      rw("XMP:Subject", "XMP-dc:Subject", Rule::Keywords),
      rw("IPTC:Keywords", "IPTC:Keywords", Rule::Keywords),
    ] },
    LogicalField::CameraModel => const { &[
      rw("EXIF:Model", "EXIF:Model", Rule::Text),
    ] },
  }
}

/// Resolves a logical field from a raw tag dictionary: first binding whose
/// tag is present, parses and is non-empty.
#[must_use]
pub fn resolve_read(raw: &BTreeMap<String, String>, field: LogicalField) -> Option<FieldValue> {
  for binding in bindings(field) {
    let Some(key) = binding.read_key else {
      continue;
    };
    let Some(value) = raw.get(key) else {
      continue;
    };

    match parse_binding(raw, binding, value) {
      Ok(Some(parsed)) if !parsed.is_empty() => return Some(parsed),
      Ok(_) => {}
      Err(()) => log::warn!("{key}: skipping unparsable value `{value}`"),
    }
  }
  None
}

fn parse_binding(
  raw: &BTreeMap<String, String>,
  binding: &Binding,
  value: &str,
) -> Result<Option<FieldValue>, ()> {
  Ok(match binding.rule {
    Rule::Text => {
      let value = value.trim();
      if value.is_empty() {
        None
      } else {
        Some(FieldValue::Text(value.to_string()))
      }
    }
    Rule::Degrees => Some(FieldValue::Degrees(conv::parse_degrees(value).ok_or(())?)),
    Rule::DegreesWithRef { ref_key, negative } => {
      let mut degrees = conv::parse_degrees(value).ok_or(())?;
      if raw.get(ref_key).is_some_and(|r| r.trim() == negative) {
        degrees = -degrees.abs();
      }
      Some(FieldValue::Degrees(degrees))
    }
    Rule::DateTime | Rule::DateTimeWithOffset => {
      let (naive, _) = conv::parse_exif_date_time(value).map_err(|_| ())?;
      Some(FieldValue::Timestamp(naive))
    }
    Rule::GpsDateStamp => {
      let time = raw.get("EXIF:GPSTimeStamp").map(String::as_str);
      Some(FieldValue::Timestamp(parse_gps_stamp(value, time)?))
    }
    Rule::GpsDateTime => {
      let (naive, _) = conv::parse_exif_date_time(value).map_err(|_| ())?;
      Some(FieldValue::Timestamp(naive))
    }
    Rule::OffsetColon => Some(FieldValue::Offset(conv::parse_offset(value).map_err(|_| ())?)),
    Rule::OffsetHours => Some(FieldValue::Offset(
      conv::parse_offset_hours(value).map_err(|_| ())?,
    )),
    Rule::Keywords => Some(FieldValue::Set(KeywordSet::from_storage(value))),
    // Write-only rules never reach here through a read key.
    Rule::GpsTimeStamp | Rule::HemisphereRef { .. } => None,
  })
}

/// Combines `GPSDateStamp` (`YYYY:MM:DD`) with the sibling `GPSTimeStamp`.
/// A missing time stamp means midnight.
fn parse_gps_stamp(date: &str, time: Option<&str>) -> Result<NaiveDateTime, ()> {
  let time = time.unwrap_or("00:00:00");
  // GPSTimeStamp may carry subseconds; the engine keeps whole seconds.
  let time = time.split('.').next().unwrap_or(time);
  let (naive, _) = conv::parse_exif_date_time(&format!("{date} {time}")).map_err(|_| ())?;
  Ok(naive)
}

/// Formats a value for every writable binding of a field. `offset` feeds the
/// XMP date tags that carry the offset inline.
#[must_use]
pub fn resolve_write(
  field: LogicalField,
  value: &FieldValue,
  offset: Option<FixedOffset>,
) -> Vec<(String, String)> {
  let mut writes = vec![];
  for binding in bindings(field) {
    let Some(key) = binding.write_key else {
      continue;
    };
    if let Some(formatted) = format_binding(binding.rule, value, offset) {
      writes.push((key.to_string(), formatted));
    }
  }
  writes
}

fn format_binding(rule: Rule, value: &FieldValue, offset: Option<FixedOffset>) -> Option<String> {
  Some(match (rule, value) {
    (Rule::Text, FieldValue::Text(s)) => s.clone(),
    (Rule::Degrees, FieldValue::Degrees(d)) => format!("{d}"),
    (Rule::DegreesWithRef { .. }, FieldValue::Degrees(d)) => format!("{}", d.abs()),
    (Rule::HemisphereRef { negative, positive }, FieldValue::Degrees(d)) => {
      if *d < 0.0 { negative } else { positive }.to_string()
    }
    (Rule::DateTime, FieldValue::Timestamp(t)) => conv::format_exif_date_time(t),
    (Rule::DateTimeWithOffset, FieldValue::Timestamp(t)) => {
      conv::format_exif_date_time_with_offset(t, offset)
    }
    (Rule::GpsDateStamp, FieldValue::Timestamp(t)) => t.format("%Y:%m:%d").to_string(),
    (Rule::GpsTimeStamp, FieldValue::Timestamp(t)) => t.format("%H:%M:%S").to_string(),
    (Rule::GpsDateTime, FieldValue::Timestamp(t)) => {
      format!("{}Z", conv::format_exif_date_time(t))
    }
    (Rule::OffsetColon, FieldValue::Offset(o)) => conv::format_offset(*o),
    (Rule::OffsetHours, FieldValue::Offset(o)) => conv::format_offset_hours(*o),
    (Rule::Keywords, FieldValue::Set(k)) => k.to_storage(),
    _ => return None,
  })
}

/// Every writable tag of a field, for fanning out a delete.
#[must_use]
pub fn delete_keys(field: LogicalField) -> Vec<String> {
  bindings(field)
    .iter()
    .filter_map(|b| b.write_key)
    .map(str::to_string)
    .collect()
}

/// Maps a write key back to the family-0 key it is read under
/// (`XMP-dc:Subject` comes back as `XMP:Subject`).
#[must_use]
pub fn read_key_for(write_key: &str) -> String {
  match write_key.split_once(':') {
    Some((group, tag)) if group.starts_with("XMP-") => format!("XMP:{tag}"),
    _ => write_key.to_string(),
  }
}
