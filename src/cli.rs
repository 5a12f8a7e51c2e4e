//! Command line flags.
//!
//! ```text
//! upload-preview [--config FILE] [--endpoint URL] [--mode multipart|url-reference] [FILE]
//! ```
//!
//! Flags override `settings.toml`. A positional FILE is submitted at start-up
//! as if it had been dropped on the window.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{RequestMode, Settings};

pub const HELP: &str = "\
upload-preview

USAGE:
  upload-preview [OPTIONS] [FILE]

OPTIONS:
  --config FILE        Read settings from FILE instead of the default location
  --endpoint URL       Processing service endpoint
  --mode MODE          multipart (default) or url-reference
  -h, --help           Print this help

ARGS:
  FILE                 Image to submit right away
";

#[derive(Debug, Default, PartialEq)]
pub struct Flags {
    pub help: bool,
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub mode: Option<RequestMode>,
    pub file: Option<PathBuf>,
    /// Arguments nobody asked for
    pub unused: Vec<OsString>,
}

impl Flags {
    pub fn from_env() -> Result<Self, pico_args::Error> {
        Self::parse(pico_args::Arguments::from_env())
    }

    pub fn parse(mut args: pico_args::Arguments) -> Result<Self, pico_args::Error> {
        let help = args.contains(["-h", "--help"]);
        let config = args.opt_value_from_str("--config")?;
        let endpoint = args.opt_value_from_str("--endpoint")?;
        let mode = args.opt_value_from_str("--mode")?;
        let file = args.opt_free_from_str()?;

        Ok(Self {
            help,
            config,
            endpoint,
            mode,
            file,
            unused: args.finish(),
        })
    }

    /// Apply the overrides on top of the loaded settings
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(endpoint) = &self.endpoint {
            settings.service.endpoint = endpoint.clone();
        }
        if let Some(mode) = self.mode {
            settings.service.mode = mode;
        }
    }
}
