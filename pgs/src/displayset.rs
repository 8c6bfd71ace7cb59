/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Groups segments into display sets.
//!
//! # Overview
//!
//! A display set (DS) runs from a presentation composition segment up to and including the
//! next end segment. Windows, palettes and objects defined by one DS stay valid for the rest of
//! the epoch, so a later DS may refer to them without redefining them. The [`Assembler`] keeps
//! that state and hands out each DS fully resolved: the composition, the active palette and
//! every object the composition places.


mod displaysetread;

pub use displaysetread::*;

use super::{
    rgb::{rgb_pixel, YcbcrPixel},
    segment::{CompositionObject, CompositionState},
};
use std::collections::BTreeMap;

/// A complete display set.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct DisplaySet {
    pub pts: u32,
    pub dts: u32,
    /// The width of the video plane the composition is placed on.
    pub width: u16,
    /// The height of the video plane the composition is placed on.
    pub height: u16,
    pub composition: Composition,
    /// Every window defined so far in the current epoch.
    pub windows: BTreeMap<u8, Window>,
    /// The palette selected by the composition.
    pub palette: Palette,
    /// The objects placed by the composition, keyed by ID.
    pub objects: BTreeMap<u16, Object>,
}

impl DisplaySet {

    /// Whether this DS clears the screen instead of showing something.
    pub fn is_clear(&self) -> bool {
        self.composition.objects.is_empty()
    }
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Composition {
    pub number: u16,
    pub state: CompositionState,
    /// Set when the DS only swaps the palette of what is already on screen.
    pub palette_update: bool,
    pub objects: Vec<CompositionObject>,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Window {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// A palette as accumulated over an epoch.
///
/// Entries that were never defined are fully transparent.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Palette {
    pub id: u8,
    pub version: u8,
    pub entries: BTreeMap<u8, PaletteEntry>,
}

impl Palette {

    /// Looks up an index and converts it to straight RGBA.
    pub fn rgba(&self, index: u8) -> [u8; 4] {
        match self.entries.get(&index) {
            Some(entry) => entry.rgba(),
            None => [0, 0, 0, 0],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq)]
pub struct PaletteEntry {
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
    pub alpha: u8,
}

impl PaletteEntry {

    pub fn rgba(&self) -> [u8; 4] {

        let rgb = rgb_pixel(YcbcrPixel { y: self.y, cb: self.cb, cr: self.cr });

        [rgb.red, rgb.green, rgb.blue, self.alpha]
    }
}

/// A fully reassembled object. The pixel data is still run-length encoded.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Object {
    pub id: u16,
    pub version: u8,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}
