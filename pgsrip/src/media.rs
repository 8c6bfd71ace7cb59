/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Finds subtitle tracks in media files and hands out their PGS streams.
//!
//! # Overview
//!
//! Two kinds of media are understood. A standalone `.sup` file is a single PGS stream whose
//! language and type are tagged in its file name (`movie.en.forced.sup`). A Matroska file
//! (`.mkv`, `.mks`) is inspected with `mkvmerge` and its PGS tracks are pulled out with
//! `mkvextract`. Both are reached through [`MediaSource`], chosen by [`open_media`].


mod mkv;
mod sup;

pub use mkv::*;
pub use sup::*;

use super::{
    classify::{classify, SubtitleType},
    language::Language,
    tool::ToolError,
};
use std::{
    fmt::Debug,
    io::Error as IoError,
    ops::Range,
    path::{Path, PathBuf},
};
use serde_json::Error as JsonError;
use thiserror::Error as ThisError;

/// A media file could not be enumerated.
#[derive(ThisError, Debug)]
pub enum CollectionError {
    #[error("{path} could not be read")]
    IoError {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("{path} is not a supported media file")]
    UnsupportedMedia {
        path: PathBuf,
    },
    #[error("{path} could not be inspected")]
    ToolError {
        path: PathBuf,
        #[source]
        source: ToolError,
    },
    #[error("{path} has unreadable track metadata")]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: JsonError,
    },
    #[error("{path} is not a valid container")]
    InvalidContainer {
        path: PathBuf,
    },
    #[error("{path} has no PGS subtitle tracks")]
    NoSubtitleTracks {
        path: PathBuf,
    },
}

/// The PGS stream of a track could not be produced.
#[derive(ThisError, Debug)]
pub enum ExtractError {
    #[error("stream could not be read")]
    IoError {
        #[from]
        source: IoError,
    },
    #[error("stream could not be extracted")]
    ToolError {
        #[from]
        source: ToolError,
    },
}

/// What is known about a subtitle track before its stream is read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackInfo {
    /// The track number within its media file.
    pub id: u64,
    /// `None` when the language is missing or undetermined.
    pub language: Option<Language>,
    pub forced: bool,
    pub name: Option<String>,
    /// Where the stream lies within the media file, when that is known.
    pub extent: Option<Range<u64>>,
}

impl TrackInfo {

    pub fn subtitle_type(&self) -> SubtitleType {
        classify(self.forced, self.name.as_deref())
    }
}

/// A file holding one or more PGS subtitle tracks.
pub trait MediaSource: Debug + Send + Sync {

    fn path(&self) -> &Path;

    /// The path outputs are named after: the media path without its extension or any
    /// language and type tags.
    fn base_path(&self) -> PathBuf;

    /// The PGS tracks of this file, in track order.
    fn tracks(&self) -> &[TrackInfo];

    /// Produces the raw PGS stream of one of this file's tracks.
    fn elementary_stream(&self, track: &TrackInfo) -> Result<Vec<u8>, ExtractError>;
}

/// Opens a media file according to its extension.
pub fn open_media(
    path: &Path,
    keep_temp_files: bool,
) -> Result<Box<dyn MediaSource>, CollectionError> {

    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("sup") => Ok(Box::new(SupFile::open(path)?)),
        Some("mkv") | Some("mks") => Ok(Box::new(MkvFile::open(path, keep_temp_files)?)),
        _ => Err(CollectionError::UnsupportedMedia { path: path.to_path_buf() }),
    }
}
