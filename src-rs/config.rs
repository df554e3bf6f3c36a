//! Environment-driven defaults for the CLI.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::preview::DEFAULT_PREVIEW_MAX;

pub const OUT_DIR_ENV: &str = "REGION_BOX_OUT_DIR";
pub const TMP_DIR_ENV: &str = "REGION_BOX_TMP_DIR";
pub const PREVIEW_MAX_ENV: &str = "REGION_BOX_PREVIEW_MAX";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Root for generated files (previews, default outputs).
    pub out_root: PathBuf,

    /// Longest preview side before the selector gets a downscaled copy.
    pub preview_max: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            out_root: PathBuf::from(".region-box"),
            preview_max: DEFAULT_PREVIEW_MAX,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let out_root = non_empty(OUT_DIR_ENV)
            .or_else(|| non_empty(TMP_DIR_ENV))
            .map(PathBuf::from)
            .unwrap_or(defaults.out_root);

        let preview_max = match non_empty(PREVIEW_MAX_ENV) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => {
                    warn!("ignoring invalid {PREVIEW_MAX_ENV}={raw:?}");
                    defaults.preview_max
                }
            },
            None => defaults.preview_max,
        };

        Self {
            out_root,
            preview_max,
        }
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.out_root.join("preview")
    }
}
