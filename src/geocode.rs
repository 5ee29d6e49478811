// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Reverse geocoding seam.
//!
//! The engine never talks to a geocoding API itself; a `GeoLookup`
//! implementation is injected and its failures degrade to "no suggestion".
//! Country codes are normalized to ISO 3166-1 alpha-3 before they land in
//! tags.

use crate::error::Error;

/// Location facts for a coordinate, as returned by a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodingResult {
  pub country:      Option<String>,
  /// ISO 3166-1 alpha-3.
  pub country_code: Option<String>,
  pub city:         Option<String>,
}

/// Reverse geocoding collaborator.
pub trait GeoLookup {
  fn lookup(&self, lat: f64, lon: f64, timeout_ms: u64) -> Result<GeocodingResult, Error>;
}

/// Runs a lookup, mapping failure to `None` with a warning. Geocoding only
/// ever produces suggestions, so it never fails an operation.
pub fn lookup_or_none(
  geo: &dyn GeoLookup,
  lat: f64,
  lon: f64,
  timeout_ms: u64,
) -> Option<GeocodingResult> {
  match geo.lookup(lat, lon, timeout_ms) {
    Ok(result) => Some(result),
    Err(e) => {
      log::warn!("({lat}, {lon}): {e}");
      None
    }
  }
}

/// Normalizes a country code to alpha-3, the only form stored in tags.
/// Alpha-2 codes (the form geocoding APIs return) are converted; anything
/// else passes through unchanged with a warning for unknown alpha-2 codes.
#[must_use]
pub fn normalize_country_code(code: &str) -> String {
  if code.len() != 2 {
    return code.to_string();
  }
  match alpha2_to_alpha3(code) {
    Some(alpha3) => alpha3.to_string(),
    None => {
      log::warn!("unknown alpha-2 country code `{code}`");
      code.to_string()
    }
  }
}

/// Converts an ISO 3166-1 alpha-2 country code (the form geocoding APIs
/// return) to alpha-3 (the form stored in tags).
#[must_use]
#[rustfmt::skip]
pub fn alpha2_to_alpha3(alpha2: &str) -> Option<&'static str> {
  Some(match alpha2.to_ascii_uppercase().as_str() {
    "AF" => "AFG", "AL" => "ALB", "DZ" => "DZA", "AD" => "AND", "AO" => "AGO", "AG" => "ATG",
    "AR" => "ARG", "AM" => "ARM", "AU" => "AUS", "AT" => "AUT", "AZ" => "AZE", "BS" => "BHS",
    "BH" => "BHR", "BD" => "BGD", "BB" => "BRB", "BY" => "BLR", "BE" => "BEL", "BZ" => "BLZ",
    "BJ" => "BEN", "BT" => "BTN", "BO" => "BOL", "BA" => "BIH", "BW" => "BWA", "BR" => "BRA",
    "BN" => "BRN", "BG" => "BGR", "BF" => "BFA", "BI" => "BDI", "KH" => "KHM", "CM" => "CMR",
    "CA" => "CAN", "CV" => "CPV", "CF" => "CAF", "TD" => "TCD", "CL" => "CHL", "CN" => "CHN",
    "CO" => "COL", "KM" => "COM", "CG" => "COG", "CD" => "COD", "CR" => "CRI", "CI" => "CIV",
    "HR" => "HRV", "CU" => "CUB", "CY" => "CYP", "CZ" => "CZE", "DK" => "DNK", "DJ" => "DJI",
    "DM" => "DMA", "DO" => "DOM", "EC" => "ECU", "EG" => "EGY", "SV" => "SLV", "GQ" => "GNQ",
    "ER" => "ERI", "EE" => "EST", "ET" => "ETH", "FJ" => "FJI", "FI" => "FIN", "FR" => "FRA",
    "GA" => "GAB", "GM" => "GMB", "GE" => "GEO", "DE" => "DEU", "GH" => "GHA", "GR" => "GRC",
    "GD" => "GRD", "GT" => "GTM", "GN" => "GIN", "GW" => "GNB", "GY" => "GUY", "HT" => "HTI",
    "HN" => "HND", "HU" => "HUN", "IS" => "ISL", "IN" => "IND", "ID" => "IDN", "IR" => "IRN",
    "IQ" => "IRQ", "IE" => "IRL", "IL" => "ISR", "IT" => "ITA", "JM" => "JAM", "JP" => "JPN",
    "JO" => "JOR", "KZ" => "KAZ", "KE" => "KEN", "KI" => "KIR", "KP" => "PRK", "KR" => "KOR",
    "KW" => "KWT", "KG" => "KGZ", "LA" => "LAO", "LV" => "LVA", "LB" => "LBN", "LS" => "LSO",
    "LR" => "LBR", "LY" => "LBY", "LI" => "LIE", "LT" => "LTU", "LU" => "LUX", "MK" => "MKD",
    "MG" => "MDG", "MW" => "MWI", "MY" => "MYS", "MV" => "MDV", "ML" => "MLI", "MT" => "MLT",
    "MH" => "MHL", "MR" => "MRT", "MU" => "MUS", "MX" => "MEX", "FM" => "FSM", "MD" => "MDA",
    "MC" => "MCO", "MN" => "MNG", "ME" => "MNE", "MA" => "MAR", "MZ" => "MOZ", "MM" => "MMR",
    "NA" => "NAM", "NR" => "NRU", "NP" => "NPL", "NL" => "NLD", "NZ" => "NZL", "NI" => "NIC",
    "NE" => "NER", "NG" => "NGA", "NO" => "NOR", "OM" => "OMN", "PK" => "PAK", "PW" => "PLW",
    "PA" => "PAN", "PG" => "PNG", "PY" => "PRY", "PE" => "PER", "PH" => "PHL", "PL" => "POL",
    "PT" => "PRT", "QA" => "QAT", "RO" => "ROU", "RU" => "RUS", "RW" => "RWA", "KN" => "KNA",
    "LC" => "LCA", "VC" => "VCT", "WS" => "WSM", "SM" => "SMR", "ST" => "STP", "SA" => "SAU",
    "SN" => "SEN", "RS" => "SRB", "SC" => "SYC", "SL" => "SLE", "SG" => "SGP", "SK" => "SVK",
    "SI" => "SVN", "SB" => "SLB", "SO" => "SOM", "ZA" => "ZAF", "SS" => "SSD", "ES" => "ESP",
    "LK" => "LKA", "SD" => "SDN", "SR" => "SUR", "SZ" => "SWZ", "SE" => "SWE", "CH" => "CHE",
    "SY" => "SYR", "TW" => "TWN", "TJ" => "TJK", "TZ" => "TZA", "TH" => "THA", "TL" => "TLS",
    "TG" => "TGO", "TO" => "TON", "TT" => "TTO", "TN" => "TUN", "TR" => "TUR", "TM" => "TKM",
    "TV" => "TUV", "UG" => "UGA", "UA" => "UKR", "AE" => "ARE", "GB" => "GBR", "US" => "USA",
    "UY" => "URY", "UZ" => "UZB", "VU" => "VUT", "VA" => "VAT", "VE" => "VEN", "VN" => "VNM",
    "YE" => "YEM", "ZM" => "ZMB", "ZW" => "ZWE",
    _ => return None,
  })
}

#[cfg(test)]
mod test_alpha2_to_alpha3 {
  use super::*;

  #[test]
  fn converts_known_codes() {
    assert_eq!(alpha2_to_alpha3("JP"), Some("JPN"));
    assert_eq!(alpha2_to_alpha3("de"), Some("DEU"));
    assert_eq!(alpha2_to_alpha3("US"), Some("USA"));
  }

  #[test]
  fn unknown_code_is_none() {
    assert_eq!(alpha2_to_alpha3("XX"), None);
    assert_eq!(alpha2_to_alpha3(""), None);
  }
}
