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
    CollectionError,
    ExtractError,
    MediaSource,
    TrackInfo,
};
use crate::{
    language::Language,
    tool::run,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use log::{debug, info};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Deserialize;
use tempfile::{Builder as TempDirBuilder, TempDir};

const PGS_CODEC: &str = "HDMV PGS";
const PGS_CODEC_ID: &str = "S_HDMV/PGS";

/// mkvmerge and mkvextract exit with 1 when they only have warnings.
const WARNING_CODE: i32 = 1;

static FORCED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bforced\b").expect("forced pattern is valid")
});

#[derive(Debug, Default, Deserialize)]
struct Identification {
    container: Option<Container>,
    #[serde(default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Default, Deserialize)]
struct Container {
    #[serde(default)]
    recognized: bool,
    #[serde(default)]
    supported: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Track {
    id: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: TrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct TrackProperties {
    codec_id: Option<String>,
    track_name: Option<String>,
    language: Option<String>,
    language_ietf: Option<String>,
    enabled_track: Option<bool>,
    forced_track: Option<bool>,
}

impl Track {

    fn is_pgs(&self) -> bool {
        self.kind == "subtitles"
            && (self.codec == PGS_CODEC
                || self.properties.codec_id.as_deref() == Some(PGS_CODEC_ID))
    }

    fn to_track_info(&self) -> TrackInfo {

        let properties = &self.properties;
        let name = properties.track_name.clone().filter(|name| !name.trim().is_empty());
        let forced = properties.forced_track.unwrap_or(false)
            || name.as_deref().map_or(false, |name| FORCED_PATTERN.is_match(name));
        let language = properties.language_ietf
            .as_deref()
            .and_then(Language::parse)
            .or_else(|| properties.language.as_deref().and_then(Language::parse));

        TrackInfo {
            id: self.id,
            language,
            forced,
            name,
            extent: None,
        }
    }
}

/// Reads the PGS tracks out of `mkvmerge -J` output.
pub(crate) fn parse_identification(
    path: &Path,
    json: &[u8],
) -> Result<Vec<TrackInfo>, CollectionError> {

    let identification = serde_json::from_slice::<Identification>(json)
        .map_err(|source| CollectionError::InvalidMetadata { path: path.to_path_buf(), source })?;

    if let Some(container) = &identification.container {
        if !container.recognized || !container.supported {
            return Err(CollectionError::InvalidContainer { path: path.to_path_buf() })
        }
    }

    let mut tracks = identification.tracks
        .iter()
        .filter(|track| track.is_pgs())
        .filter(|track| {
            let enabled = track.properties.enabled_track != Some(false);
            if !enabled {
                debug!("{}: ignoring disabled track {}", path.display(), track.id);
            }
            enabled
        })
        .map(Track::to_track_info)
        .collect::<Vec<TrackInfo>>();

    if tracks.is_empty() {
        return Err(CollectionError::NoSubtitleTracks { path: path.to_path_buf() })
    }

    tracks.sort_by_key(|track| track.id);

    Ok(tracks)
}

/// A Matroska file with at least one PGS track.
#[derive(Debug)]
pub struct MkvFile {
    path: PathBuf,
    tracks: Vec<TrackInfo>,
    temp_dir: OnceCell<TempDir>,
    keep_temp_files: bool,
}

impl MkvFile {

    pub fn open(path: &Path, keep_temp_files: bool) -> Result<Self, CollectionError> {

        let json = run(Command::new("mkvmerge").arg("-J").arg(path), &[WARNING_CODE])
            .map_err(|source| CollectionError::ToolError { path: path.to_path_buf(), source })?;
        let tracks = parse_identification(path, &json)?;

        debug!("{}: {} PGS tracks", path.display(), tracks.len());

        Ok(
            MkvFile {
                path: path.to_path_buf(),
                tracks,
                temp_dir: OnceCell::new(),
                keep_temp_files,
            }
        )
    }

    fn temp_dir(&self) -> Result<&Path, ExtractError> {

        let temp_dir = self.temp_dir.get_or_try_init(|| {
            let prefix = self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            TempDirBuilder::new().prefix(&prefix).suffix(".pgsrip").tempdir()
        })?;

        Ok(temp_dir.path())
    }
}

impl MediaSource for MkvFile {

    fn path(&self) -> &Path {
        &self.path
    }

    fn base_path(&self) -> PathBuf {
        self.path.with_extension("")
    }

    fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    fn elementary_stream(&self, track: &TrackInfo) -> Result<Vec<u8>, ExtractError> {

        let file_name = match track.language {
            Some(language) => format!("{}.{}.sup", track.id, language),
            None => format!("{}.sup", track.id),
        };
        let sup_path = self.temp_dir()?.join(file_name);
        let mut spec = std::ffi::OsString::from(format!("{}:", track.id));

        spec.push(&sup_path);

        run(
            Command::new("mkvextract").arg(&self.path).arg("tracks").arg(spec),
            &[WARNING_CODE],
        )?;

        let data = fs::read(&sup_path)?;

        if !self.keep_temp_files {
            fs::remove_file(&sup_path)?;
        }

        Ok(data)
    }
}

impl Drop for MkvFile {
    fn drop(&mut self) {
        if self.keep_temp_files {
            if let Some(temp_dir) = self.temp_dir.take() {
                info!("keeping temporary files in {}", temp_dir.into_path().display());
            }
        }
    }
}
