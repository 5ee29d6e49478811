// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Keeps photo EXIF/XMP/IPTC metadata consistent and geotagged, acting as a
//! wrapper around `ExifTool`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

mod batch;
mod commands;
mod config;
mod error;
mod geocode;
mod io;
mod prim;
mod rank;
mod scan;
mod setup;
mod tags;
#[cfg(test)]
mod testing;

#[derive(Parser)]
struct Args {
  /// Directory of photos. Defaults to the last used directory.
  #[arg(short, global = true)]
  directory: Option<PathBuf>,

  /// Verbosity level. Max: 2.
  #[arg(short, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List each photo's resolved metadata.
  Scan,
  /// Write a GPS position into every photo.
  Geotag { latitude: f64, longitude: f64 },
  /// Set the time zone offset from a named zone, or from each photo's
  /// position when no zone is given.
  Offset { zone: Option<String> },
  /// Recompute GPS timestamps from taken dates.
  GpsDate,
  /// Fill missing taken dates from file creation times.
  TakenDate,
  /// Rename one photo, carrying its backup sibling along.
  Rename { file: String, new_name: String },
  /// Print ranked location suggestions from a scorer's candidate file.
  Suggest { candidates: PathBuf },
}

fn main() {
  let args = Args::parse();
  setup::configure_logging(args.verbose);

  let directory = match args
    .directory
    .or_else(|| config::Config::load().last_directory)
  {
    Some(directory) => directory,
    None => {
      log::error!("No directory given and no previous one remembered.");
      std::process::exit(1);
    }
  };

  let result = match args.command {
    Commands::Scan => commands::scan(&directory),
    Commands::Geotag {
      latitude,
      longitude,
    } => commands::geotag(&directory, latitude, longitude),
    Commands::Offset { zone } => commands::offset(&directory, zone.as_deref()),
    Commands::GpsDate => commands::gps_date(&directory),
    Commands::TakenDate => commands::taken_date(&directory),
    Commands::Rename { file, new_name } => commands::rename(&directory, &file, &new_name),
    Commands::Suggest { candidates } => commands::suggest(&directory, &candidates),
  };

  if let Err(e) = result {
    log::error!("{e}");
    std::process::exit(1);
  }
}
