/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! SubRip output.

#[cfg(test)]
mod tests;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Cues with identical text this close together are shown as one entry.
pub const MERGE_EPSILON_MS: u64 = 10;

/// Recognized text with the interval it is shown for, in milliseconds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cue {
    pub start: u64,
    pub end: u64,
    pub text: String,
}

/// A numbered entry of a SubRip file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SrtEntry {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub text: String,
}

impl Display for SrtEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", timestamp(self.start), timestamp(self.end))?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Formats milliseconds as `HH:MM:SS,mmm`.
pub fn timestamp(ms: u64) -> String {

    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Numbers cues in timeline order.
///
/// Blank cues are dropped. A cue whose text matches the previous one and starts within
/// [`MERGE_EPSILON_MS`] of its end extends that entry instead of starting a new one.
pub fn entries<I>(cues: I) -> Vec<SrtEntry>
where
    I: IntoIterator<Item = Cue>,
{
    let mut entries = Vec::<SrtEntry>::new();

    for cue in cues {

        let text = normalize(&cue.text);

        if text.is_empty() {
            continue
        }

        if let Some(last) = entries.last_mut() {
            if last.text == text && cue.start.abs_diff(last.end) <= MERGE_EPSILON_MS {
                last.end = last.end.max(cue.end);
                continue
            }
        }

        entries.push(
            SrtEntry {
                index: entries.len() + 1,
                start: cue.start,
                end: cue.end,
                text,
            }
        );
    }

    entries
}

/// Writes entries as the contents of a SubRip file.
pub fn serialize(entries: &[SrtEntry]) -> String {
    entries.iter().map(ToString::to_string).collect()
}

fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}
