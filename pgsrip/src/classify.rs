/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Tells full, forced and SDH subtitle tracks apart.


use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error as ThisError;

static SDH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(sdh|cc|hearing[\s_-]*impaired|deaf)\b").expect("SDH pattern is valid")
});

/// How a subtitle track is meant to be presented.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SubtitleType {
    /// Every line of dialogue.
    Full,
    /// Only what must be shown regardless of the viewer's subtitle setting.
    Forced,
    /// Dialogue plus sound cues for the deaf and hard of hearing.
    Sdh,
}

impl SubtitleType {

    /// The tag used in output file names.
    pub fn suffix(self) -> &'static str {
        match self {
            SubtitleType::Full => "full",
            SubtitleType::Forced => "forced",
            SubtitleType::Sdh => "sdh",
        }
    }
}

impl Display for SubtitleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            SubtitleType::Full => "FULL",
            SubtitleType::Forced => "FORCED",
            SubtitleType::Sdh => "SDH",
        })
    }
}

/// Classifies a track. A forced flag wins over anything the name says.
pub fn classify(forced: bool, name: Option<&str>) -> SubtitleType {
    if forced {
        SubtitleType::Forced
    } else if name.map_or(false, |name| SDH_PATTERN.is_match(name)) {
        SubtitleType::Sdh
    } else {
        SubtitleType::Full
    }
}

#[derive(ThisError, Debug, Clone, PartialEq)]
#[error("unknown subtitle type filter {0:?}")]
pub struct UnknownFilter(pub String);

/// Selects which subtitle types are ripped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SubtitleTypeFilter {
    FullOnly,
    ForcedOnly,
    SdhOnly,
    ForcedIncluded,
    SdhIncluded,
    AllIncluded,
}

impl SubtitleTypeFilter {

    pub const ALL: [SubtitleTypeFilter; 6] = [
        SubtitleTypeFilter::FullOnly,
        SubtitleTypeFilter::ForcedOnly,
        SubtitleTypeFilter::SdhOnly,
        SubtitleTypeFilter::ForcedIncluded,
        SubtitleTypeFilter::SdhIncluded,
        SubtitleTypeFilter::AllIncluded,
    ];

    /// The subtitle types that pass this filter.
    pub fn types(self) -> &'static [SubtitleType] {
        match self {
            SubtitleTypeFilter::FullOnly => &[SubtitleType::Full],
            SubtitleTypeFilter::ForcedOnly => &[SubtitleType::Forced],
            SubtitleTypeFilter::SdhOnly => &[SubtitleType::Sdh],
            SubtitleTypeFilter::ForcedIncluded => &[SubtitleType::Full, SubtitleType::Forced],
            SubtitleTypeFilter::SdhIncluded => &[SubtitleType::Full, SubtitleType::Sdh],
            SubtitleTypeFilter::AllIncluded => {
                &[SubtitleType::Full, SubtitleType::Forced, SubtitleType::Sdh]
            }
        }
    }

    pub fn accepts(self, subtitle_type: SubtitleType) -> bool {
        self.types().contains(&subtitle_type)
    }

    pub fn name(self) -> &'static str {
        match self {
            SubtitleTypeFilter::FullOnly => "full-only",
            SubtitleTypeFilter::ForcedOnly => "forced-only",
            SubtitleTypeFilter::SdhOnly => "sdh-only",
            SubtitleTypeFilter::ForcedIncluded => "forced-included",
            SubtitleTypeFilter::SdhIncluded => "sdh-included",
            SubtitleTypeFilter::AllIncluded => "all-included",
        }
    }
}

impl Default for SubtitleTypeFilter {
    fn default() -> Self { Self::AllIncluded }
}

impl Display for SubtitleTypeFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for SubtitleTypeFilter {

    type Err = UnknownFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SubtitleTypeFilter::ALL
            .iter()
            .copied()
            .find(|filter| filter.name() == value)
            .ok_or_else(|| UnknownFilter(value.to_string()))
    }
}
