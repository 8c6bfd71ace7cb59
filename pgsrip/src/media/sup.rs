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
use crate::language::Language;
use std::{
    fs,
    path::{Path, PathBuf},
};
use log::debug;

/// A standalone PGS stream.
///
/// Everything known about the track comes from the file name: `movie.en.sup` is English,
/// `movie.en.forced.sup` is forced and `movie.en.sdh.sup` is SDH.
#[derive(Debug)]
pub struct SupFile {
    path: PathBuf,
    base_path: PathBuf,
    tracks: Vec<TrackInfo>,
}

impl SupFile {

    pub fn open(path: &Path) -> Result<Self, CollectionError> {

        let length = fs::metadata(path)
            .map_err(|source| CollectionError::IoError { path: path.to_path_buf(), source })?
            .len();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tags = NameTags::parse(&stem);
        let track = TrackInfo {
            id: 0,
            language: tags.language,
            forced: tags.forced,
            name: tags.name,
            extent: Some(0..length),
        };

        debug!("{}: {:?}", path.display(), track);

        Ok(
            SupFile {
                path: path.to_path_buf(),
                base_path: path.with_file_name(tags.base),
                tracks: vec![track],
            }
        )
    }
}

impl MediaSource for SupFile {

    fn path(&self) -> &Path {
        &self.path
    }

    fn base_path(&self) -> PathBuf {
        self.base_path.clone()
    }

    fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    fn elementary_stream(&self, _track: &TrackInfo) -> Result<Vec<u8>, ExtractError> {
        Ok(fs::read(&self.path)?)
    }
}

/// The tags trailing the stem of a file name.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct NameTags {
    pub base: String,
    pub language: Option<Language>,
    pub forced: bool,
    pub name: Option<String>,
}

impl NameTags {

    pub fn parse(stem: &str) -> Self {

        let mut parts = stem.split('.').collect::<Vec<&str>>();
        let mut tags = NameTags::default();

        while parts.len() > 1 {

            let part = parts[parts.len() - 1].to_lowercase();

            match part.as_str() {
                "forced" => tags.forced = true,
                "sdh" | "cc" => tags.name = Some(part.to_uppercase()),
                // `hi` is Hindi unless a language tag precedes it.
                "hi" if parts.len() > 2 && Language::parse(parts[parts.len() - 2]).is_some() => {
                    tags.name = Some("hearing impaired".to_string())
                }
                "full" => {}
                _ => match Language::parse(&part) {
                    Some(language) if tags.language.is_none() => tags.language = Some(language),
                    _ => break,
                },
            }

            parts.pop();
        }

        tags.base = parts.join(".");
        tags
    }
}
