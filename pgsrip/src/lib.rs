/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Rips PGS subtitle tracks into SubRip files.
//!
//! Media files are opened through [`media`], their tracks are classified by [`classify`] and
//! chosen by [`rip::select_tracks`]. Each chosen track is parsed by the `pgs` crate, its
//! captions are read by a [`recognize::Recognizer`] and the text is written by [`output`].
//! [`rip::Ripper`] ties this together for batches of files.

pub mod classify;
pub mod language;
pub mod media;
pub mod options;
pub mod output;
pub mod recognize;
pub mod rip;
pub mod srt;
pub mod tool;

pub use classify::{SubtitleType, SubtitleTypeFilter};
pub use language::Language;
pub use options::{Options, TesseractConfig};
pub use rip::{Ripper, RipEvent, Summary};
