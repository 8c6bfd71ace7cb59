/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Names output files and decides whether they get written.


use super::{
    classify::SubtitleType,
    language::Language,
    options::Options,
};
use std::{
    ffi::OsString,
    fs,
    io::{Error as IoError, ErrorKind, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use log::debug;
use tempfile::Builder as TempFileBuilder;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
#[error("{path} could not be written")]
pub struct OutputError {
    pub path: PathBuf,
    #[source]
    pub source: IoError,
}

/// What happened to an output file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Decision {
    Written,
    /// The file already has the same content.
    Unchanged,
    /// A different file exists and overwriting was not requested.
    SkippedExisting,
    /// A different file exists but it is younger than the configured age.
    SkippedYoung,
}

/// Builds `<base>[-<number>].<language>[.<type>].<extension>`.
///
/// The type is left out for full subtitles when they are the only type written for their
/// language. A number of zero is left out.
pub fn target_path(
    base: &Path,
    number: usize,
    language: Language,
    subtitle_type: SubtitleType,
    single_type: bool,
    extension: &str,
) -> PathBuf {

    let mut name = base.file_name().map(OsString::from).unwrap_or_default();

    if number > 0 {
        name.push(format!("-{}", number));
    }

    name.push(".");
    name.push(language.code());

    if !(single_type && subtitle_type == SubtitleType::Full) {
        name.push(".");
        name.push(subtitle_type.suffix());
    }

    name.push(".");
    name.push(extension);

    base.with_file_name(name)
}

/// How long ago a file was last modified.
pub fn file_age(path: &Path) -> Result<Duration, IoError> {

    let modified = fs::metadata(path)?.modified()?;

    Ok(SystemTime::now().duration_since(modified).unwrap_or_default())
}

/// Decides what would happen to an existing output without knowing the new content.
///
/// Returns `Some` only when the outcome is settled already, so no recognition needs to be done.
pub fn precheck(path: &Path, options: &Options) -> Result<Option<Decision>, OutputError> {

    if !options.overwrite {
        return Ok(None)
    }

    match (options.srt_age, file_age(path)) {
        (Some(srt_age), Ok(age)) if age < srt_age => Ok(Some(Decision::SkippedYoung)),
        (_, Err(source)) if source.kind() != ErrorKind::NotFound => {
            Err(OutputError { path: path.to_path_buf(), source })
        }
        _ => Ok(None),
    }
}

/// Writes `contents` to `path` unless an equivalent file is there already or the existing
/// file must be kept.
///
/// The file is written under a temporary name first and renamed into place.
pub fn write_output(
    path: &Path,
    contents: &str,
    options: &Options,
) -> Result<Decision, OutputError> {

    let error = |source: IoError| OutputError { path: path.to_path_buf(), source };

    match fs::read(path) {
        Ok(existing) => {
            if equivalent(&existing, contents) {
                debug!("{} is up to date", path.display());
                return Ok(Decision::Unchanged)
            }
            if !options.overwrite {
                debug!("{} exists and differs", path.display());
                return Ok(Decision::SkippedExisting)
            }
            if let Some(Decision::SkippedYoung) = precheck(path, options)? {
                return Ok(Decision::SkippedYoung)
            }
        }
        Err(source) if source.kind() == ErrorKind::NotFound => {}
        Err(source) => return Err(error(source)),
    }

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = TempFileBuilder::new()
        .prefix(".pgsrip-")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(error)?;

    file.write_all(contents.as_bytes()).map_err(error)?;
    file.persist(path).map_err(|persist| error(persist.error))?;

    debug!("wrote {}", path.display());

    Ok(Decision::Written)
}

fn equivalent(existing: &[u8], contents: &str) -> bool {

    let decoded = String::from_utf8_lossy(existing);
    let existing = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

    existing.replace("\r\n", "\n") == contents.replace("\r\n", "\n")
}
