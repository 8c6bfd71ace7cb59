/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use super::{
    classify::SubtitleTypeFilter,
    language::Language,
};
use std::{
    collections::HashSet,
    num::NonZeroUsize,
    path::PathBuf,
    thread::available_parallelism,
    time::Duration,
};
use once_cell::sync::Lazy;
use regex::Regex;

static AGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?$").expect("age pattern is valid")
});

/// Settings for the `tesseract` command.
#[derive(Clone, Debug, PartialEq)]
pub struct TesseractConfig {
    /// The program to run.
    pub binary: PathBuf,
    /// Passed as `--tessdata-dir` when set.
    pub tessdata_dir: Option<PathBuf>,
    /// The OCR engine mode (`--oem`).
    pub engine_mode: u8,
    /// The page segmentation mode (`--psm`).
    pub page_segmentation_mode: u8,
    /// Words below this confidence (0-100) are discarded unless the same word was also
    /// recognized with enough confidence.
    pub confidence: u8,
    /// Exported as `OMP_THREAD_LIMIT` when set.
    pub omp_thread_limit: Option<usize>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            engine_mode: 1,
            page_segmentation_mode: 6,
            confidence: 65,
            omp_thread_limit: None,
        }
    }
}

/// Everything that controls a rip, built once and shared by every worker.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Accepted languages. Empty accepts any known language.
    pub languages: HashSet<Language>,
    pub type_filter: SubtitleTypeFilter,
    /// Replace existing outputs whose content differs.
    pub overwrite: bool,
    /// Keep only the first track of each language and subtitle type per media file.
    pub one_per_lang: bool,
    /// How many tracks are processed at once.
    pub max_workers: usize,
    /// How many recognizer calls one track may have in flight.
    pub recognition_workers: usize,
    /// When overwriting, leave outputs younger than this alone.
    pub srt_age: Option<Duration>,
    /// Skip media files that were last modified longer ago than this.
    pub age: Option<Duration>,
    /// Keep extracted streams and generated images.
    pub keep_temp_files: bool,
    /// The extension of written subtitle files.
    pub extension: String,
    pub tesseract: TesseractConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            languages: HashSet::new(),
            type_filter: SubtitleTypeFilter::default(),
            overwrite: false,
            one_per_lang: true,
            max_workers: available_parallelism().map(NonZeroUsize::get).unwrap_or(1),
            recognition_workers: 1,
            srt_age: None,
            age: None,
            keep_temp_files: false,
            extension: "srt".to_string(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl Options {

    pub fn accepts_language(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }
}

/// Parses an age such as `12h`, `2d` or `1w2d`.
pub fn parse_age(value: &str) -> Option<Duration> {

    if value.is_empty() {
        return None
    }

    let captures = AGE_PATTERN.captures(value)?;
    let mut hours = 0_u64;

    for (index, factor) in [(1, 7 * 24), (2, 24), (3, 1)] {
        if let Some(capture) = captures.get(index) {
            let value = capture.as_str().parse::<u64>().ok()?.checked_mul(factor)?;
            hours = hours.checked_add(value)?;
        }
    }

    Some(Duration::from_secs(hours.checked_mul(3_600)?))
}
