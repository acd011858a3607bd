//! # CLI - Command-Line Surface
//!
//! A single flat command: `boolnet-sim [-o prefix] bnd_file cfg_file`. With
//! `-o prefix`, every accumulator writes its CSV report; without it, the
//! composite's textual report goes to stdout.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Network definition file (.bnd)
    pub bnd_file: PathBuf,

    /// Configuration file (.cfg)
    pub cfg_file: PathBuf,

    /// Write CSV reports prefixed with this path instead of printing to stdout
    #[arg(short = 'o', long = "output")]
    pub output_prefix: Option<String>,
}
