//! Per-run build context

use crate::core::error::UploadError;
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;

lazy_static! {
    /// Date stamps end up in Debian versions, so they must start with a digit
    static ref DATE_STAMP: Regex = Regex::new(r"^[0-9][0-9A-Za-z.+~]*$").unwrap();
}

/// Values fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    /// Date stamp, e.g. `20081015`
    pub date: String,
    /// Distinguishes several uploads made on the same date
    pub revision: u32,
    /// Directory the per-run directory is created in
    pub root_dir: PathBuf,
    /// Exported source tree holding one staging directory per package
    pub base_dir: PathBuf,
    /// Distro packaging directory holding `<package>-debian` trees
    pub packaging_dir: PathBuf,
}

impl BuildContext {
    pub fn new(
        date: impl Into<String>,
        revision: u32,
        root_dir: impl Into<PathBuf>,
        base_dir: impl Into<PathBuf>,
        packaging_dir: impl Into<PathBuf>,
    ) -> Result<Self, UploadError> {
        let date = date.into();
        if !DATE_STAMP.is_match(&date) {
            return Err(UploadError::InvalidContext {
                field: "date".to_string(),
                message: format!("'{}' cannot be used in a package version", date),
            });
        }

        Ok(Self {
            date,
            revision,
            root_dir: root_dir.into(),
            base_dir: base_dir.into(),
            packaging_dir: packaging_dir.into(),
        })
    }

    /// Today's UTC date as `YYYYMMDD`
    pub fn today() -> String {
        Self::date_stamp(Utc::now().date_naive())
    }

    pub fn date_stamp(date: NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }
}
