// Copyright 2023-5 Seth Pendergrass. See LICENSE.

use chrono::{NaiveDate, NaiveDateTime};

pub fn make_date_naive(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(year, month, day)
    .and_then(|d| d.and_hms_opt(hour, min, sec))
    .unwrap_or_else(|| panic!("Invalid date & time: {year}-{month}-{day}T{hour}:{min}:{sec}"))
}
