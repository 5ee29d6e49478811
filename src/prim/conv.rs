// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Conversions between tag text, dates, offsets and coordinates.

use std::sync::LazyLock;

use chrono::{FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use tzf_rs::DefaultFinder;

use crate::error::Error;

static ZONE_FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// Converts degrees, minutes and seconds to decimal degrees.
#[must_use]
pub fn dms_to_degrees(deg: f64, min: f64, sec: f64) -> f64 {
  deg + (min / 60.0) + (sec / 3600.0)
}

/// Determines the UTC offset at a given local date & time, within the named
/// time zone. Selects the standard or daylight variant from the full date.
///
/// At a fall-back transition the local time exists twice; the earlier
/// (pre-transition) offset wins. At a spring-forward transition the local
/// time does not exist; the post-transition offset wins.
pub fn offset_for(date_time: &NaiveDateTime, time_zone: &str) -> Result<FixedOffset, Error> {
  let tz = time_zone
    .parse::<Tz>()
    .map_err(|_| Error::UnknownTimeZone(time_zone.to_string()))?;

  Ok(match tz.offset_from_local_datetime(date_time) {
    LocalResult::Single(offset) | LocalResult::Ambiguous(offset, _) => offset.fix(),
    LocalResult::None => tz.offset_from_utc_datetime(date_time).fix(),
  })
}

/// GPS timestamps are UTC: local taken time minus the offset.
#[must_use]
pub fn gps_date_from_taken(taken: &NaiveDateTime, offset: FixedOffset) -> NaiveDateTime {
  *taken - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

/// Formats an offset as `±HH:MM`. Inverse of `parse_offset`.
#[must_use]
pub fn format_offset(offset: FixedOffset) -> String {
  let secs = offset.local_minus_utc();
  let sign = if secs < 0 { '-' } else { '+' };
  let secs = secs.abs();

  format!("{sign}{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

/// Parses a `±HH:MM` offset string. The sign is required.
pub fn parse_offset(offset: &str) -> Result<FixedOffset, Error> {
  let re = Regex::new(r"^([+-])(\d{2}):(\d{2})$").unwrap();

  let err = || Error::TagParse {
    tag:   "offset",
    value: offset.to_string(),
  };

  let caps = re.captures(offset).ok_or_else(err)?;

  let hours = caps[2].parse::<i32>().map_err(|_| err())?;
  let minutes = caps[3].parse::<i32>().map_err(|_| err())?;
  let mut secs = hours * 3600 + minutes * 60;
  if &caps[1] == "-" {
    secs = -secs;
  }

  FixedOffset::east_opt(secs).ok_or_else(err)
}

/// Formats an offset as fractional hours, the convention of
/// `EXIF:TimeZoneOffset` (e.g. `-8`, `5.5`).
#[must_use]
pub fn format_offset_hours(offset: FixedOffset) -> String {
  let hours = f64::from(offset.local_minus_utc()) / 3600.0;

  if hours.fract() == 0.0 {
    #[allow(clippy::cast_possible_truncation)]
    let whole = hours as i64;
    format!("{whole}")
  } else {
    format!("{hours}")
  }
}

/// Parses an `EXIF:TimeZoneOffset` value. The tag may hold two values
/// (capture and digitization); only the first is used.
pub fn parse_offset_hours(value: &str) -> Result<FixedOffset, Error> {
  let err = || Error::TagParse {
    tag:   "TimeZoneOffset",
    value: value.to_string(),
  };

  let first = value.split_whitespace().next().ok_or_else(err)?;
  let hours = first.parse::<f64>().map_err(|_| err())?;

  #[allow(clippy::cast_possible_truncation)]
  FixedOffset::east_opt((hours * 3600.0).round() as i32).ok_or_else(err)
}

/// Parses an ExifTool date & time string (`YYYY:MM:DD HH:MM:SS`), optionally
/// with subseconds and a trailing offset or `Z`.
pub fn parse_exif_date_time(
  date_time: &str,
) -> Result<(NaiveDateTime, Option<FixedOffset>), Error> {
  let re =
    Regex::new(r"^(\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2})(?:\.\d{1,3})?(Z|[+-]\d{2}:\d{2})?$")
      .unwrap();

  let err = || Error::TagParse {
    tag:   "date",
    value: date_time.to_string(),
  };

  let caps = re.captures(date_time).ok_or_else(err)?;

  let naive = NaiveDateTime::parse_from_str(caps.get(1).unwrap().as_str(), "%Y:%m:%d %H:%M:%S")
    .map_err(|_| err())?;

  let offset = match caps.get(2).map(|m| m.as_str()) {
    None => None,
    Some("Z") => Some(FixedOffset::east_opt(0).unwrap()),
    Some(tz) => Some(parse_offset(tz)?),
  };

  Ok((naive, offset))
}

/// Formats a date & time in ExifTool's `YYYY:MM:DD HH:MM:SS` form.
#[must_use]
pub fn format_exif_date_time(date_time: &NaiveDateTime) -> String {
  date_time.format("%Y:%m:%d %H:%M:%S").to_string()
}

/// As `format_exif_date_time`, with the offset appended when known. XMP date
/// tags carry the offset inline; EXIF keeps it in a separate tag.
#[must_use]
pub fn format_exif_date_time_with_offset(
  date_time: &NaiveDateTime,
  offset: Option<FixedOffset>,
) -> String {
  match offset {
    Some(offset) => format!("{}{}", format_exif_date_time(date_time), format_offset(offset)),
    None => format_exif_date_time(date_time),
  }
}

/// Parses a coordinate value into signed decimal degrees. Accepts plain
/// decimal (ExifTool `-n` output), decimal with a hemisphere suffix
/// (`47.6061 N`), and DMS (`47 deg 36' 21.96" N`).
#[must_use]
pub fn parse_degrees(value: &str) -> Option<f64> {
  let value = value.trim();

  if let Ok(decimal) = value.parse::<f64>() {
    return Some(decimal);
  }

  let re_suffixed = Regex::new(r"^(\d+\.?\d*) ([NnSsEeWw])$").unwrap();
  if let Some(caps) = re_suffixed.captures(value) {
    let decimal = caps[1].parse::<f64>().ok()?;
    return Some(apply_hemisphere(decimal, &caps[2]));
  }

  let re_dms = Regex::new(r#"^(\d+) deg (\d+)' (\d+\.?\d*)" ([NnSsEeWw])$"#).unwrap();
  if let Some(caps) = re_dms.captures(value) {
    let deg = caps[1].parse::<f64>().ok()?;
    let min = caps[2].parse::<f64>().ok()?;
    let sec = caps[3].parse::<f64>().ok()?;
    return Some(apply_hemisphere(dms_to_degrees(deg, min, sec), &caps[4]));
  }

  None
}

fn apply_hemisphere(decimal: f64, hemisphere: &str) -> f64 {
  if matches!(hemisphere, "S" | "s" | "W" | "w") {
    -decimal
  } else {
    decimal
  }
}

/// Great-circle distance between two coordinates, in meters. Haversine on a
/// spherical earth; fine for deduplication thresholds.
#[must_use]
pub fn great_circle_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  const EARTH_RADIUS_M: f64 = 6_371_000.0;

  let d_lat = (lat2 - lat1).to_radians();
  let d_lon = (lon2 - lon1).to_radians();

  let a = (d_lat / 2.0).sin().powi(2)
    + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

  2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Looks up the IANA zone covering a coordinate, for suggesting the zone
/// whose DST rules apply at a GPS fix.
#[must_use]
pub fn zone_for_position(lat: f64, lon: f64) -> Option<&'static str> {
  // tzf takes (longitude, latitude).
  let zone = ZONE_FINDER.get_tz_name(lon, lat);

  if zone.is_empty() { None } else { Some(zone) }
}

#[cfg(test)]
mod test_offset_for {
  use super::*;
  use crate::testing::*;

  #[test]
  fn errors_on_unknown_zone() {
    let date = make_date_naive(2025, 1, 1, 0, 0, 0);

    assert!(offset_for(&date, "Mars/Olympus_Mons").is_err());
  }

  #[test]
  fn resolves_ambiguous_fall_back_to_earlier_offset() {
    // 2025-11-02 01:30 occurs twice in Los Angeles; PDT comes first.
    let date = make_date_naive(2025, 11, 2, 1, 30, 0);

    let offset = offset_for(&date, "America/Los_Angeles").unwrap();

    assert_eq!(offset, FixedOffset::east_opt(-7 * 3600).unwrap());
  }

  #[test]
  fn returns_pdt_after_spring_clock_change() {
    let date = make_date_naive(2025, 3, 9, 3, 0, 0);

    let offset = offset_for(&date, "America/Los_Angeles").unwrap();

    assert_eq!(offset, FixedOffset::east_opt(-7 * 3600).unwrap());
  }

  #[test]
  fn returns_pst_before_spring_clock_change() {
    let date = make_date_naive(2025, 3, 9, 1, 59, 59);

    let offset = offset_for(&date, "America/Los_Angeles").unwrap();

    assert_eq!(offset, FixedOffset::east_opt(-8 * 3600).unwrap());
  }
}

#[cfg(test)]
mod test_gps_date_from_taken {
  use super::*;
  use crate::testing::*;

  #[test]
  fn crosses_day_boundary_backward() {
    let taken = make_date_naive(2000, 1, 1, 0, 30, 0);
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();

    assert_eq!(
      gps_date_from_taken(&taken, offset),
      make_date_naive(1999, 12, 31, 22, 30, 0)
    );
  }

  #[test]
  fn crosses_day_boundary_forward() {
    let taken = make_date_naive(2000, 1, 1, 23, 30, 0);
    let offset = FixedOffset::east_opt(-8 * 3600).unwrap();

    assert_eq!(
      gps_date_from_taken(&taken, offset),
      make_date_naive(2000, 1, 2, 7, 30, 0)
    );
  }
}


#[cfg(test)]
mod test_offset_hours {
  use super::*;

  #[test]
  fn formats_fractional_hours() {
    assert_eq!(
      format_offset_hours(FixedOffset::east_opt(5 * 3600 + 1800).unwrap()),
      "5.5"
    );
  }

  #[test]
  fn formats_whole_hours_without_fraction() {
    assert_eq!(format_offset_hours(FixedOffset::east_opt(-8 * 3600).unwrap()), "-8");
  }

  #[test]
  fn parses_first_of_two_values() {
    assert_eq!(
      parse_offset_hours("-8 -8").unwrap(),
      FixedOffset::east_opt(-8 * 3600).unwrap()
    );
  }
}



#[cfg(test)]
mod test_zone_for_position {
  use super::*;

  #[test]
  fn finds_paris() {
    assert_eq!(zone_for_position(48.8566, 2.3522), Some("Europe/Paris"));
  }

  #[test]
  fn finds_seattle() {
    assert_eq!(zone_for_position(47.6061, -122.3328), Some("America/Los_Angeles"));
  }
}
