// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Program setup functions.

use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Sets up `env_logger` with the format "ERROR_LEVEL message" (e.g. "WARN
/// skipping unparsable value").
///
/// Log levels:
/// Error: Per-file and program errors.
/// Warn: Skipped operations and unparsable tags.
/// Info: General program flow.
/// Debug: Per-file detail.
/// Trace: `ExifTool` output.
pub fn configure_logging(verbosity: u8) {
  let level = match verbosity {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  Builder::new()
    .filter_level(level)
    .format(|buf, record| {
      let style = buf.default_level_style(record.level());
      writeln!(buf, "{style}{}{style:#}\t{}", record.level(), record.args())
    })
    .init();
}
