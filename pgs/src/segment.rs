/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Operates on individual segments.
//!
//! # Overview
//!
//! A segment is the most fundamental data structure within a PGS bitstream. Multiple segments
//! come together in a well-defined manner to form a display set (DS).
//!
//! There are five types that typically appear in this order:
//!
//! 1. Presentation Composition Segment (PCS)
//! 2. Window Definition Segment (WDS)
//! 3. Palette Definition Segment (PDS)
//! 4. Object Definition Segment (ODS)
//! 5. End Segment (ES)
//!
//! Every segment starts with the same 13-byte header: the `PG` magic number, a PTS, a DTS, a
//! one-byte kind and a two-byte payload size, all big endian.
//!
//! ## Object fragments
//!
//! An ODS payload is limited to 64 KiB, so a large object is split across several segments.
//! The first fragment carries the total data length and the object dimensions; continuation
//! and last fragments carry only raw data. Reassembly happens in [`displayset`](crate::displayset).

#[cfg(test)]
mod tests;

mod segmentread;
mod segmentwrite;

pub use segmentread::*;
pub use segmentwrite::*;

/// The magic number (`PG`) that prefixes every segment.
pub const MAGIC_NUMBER: u16 = 0x5047;

/// The size of the fixed segment header in bytes.
pub const HEADER_SIZE: usize = 13;

pub(crate) const KIND_PDS: u8 = 0x14;
pub(crate) const KIND_ODS: u8 = 0x15;
pub(crate) const KIND_PCS: u8 = 0x16;
pub(crate) const KIND_WDS: u8 = 0x17;
pub(crate) const KIND_END: u8 = 0x80;

/// Represents a PGS segment.
#[derive(Clone, Debug, Hash, PartialEq)]
pub enum Segment {
    /// Represents a Presentation Composition Segment (PCS).
    PresentationComposition(PresentationCompositionSegment),
    /// Represents a Window Definition Segment (WDS).
    WindowDefinition(WindowDefinitionSegment),
    /// Represents a Palette Definition Segment (PDS).
    PaletteDefinition(PaletteDefinitionSegment),
    /// Represents an Object Definition Segment (ODS).
    ObjectDefinition(ObjectDefinitionSegment),
    /// Represents an End Segment (ES).
    End(EndSegment),
}

impl Segment {

    /// The presentation timestamp shared by every segment type.
    pub fn pts(&self) -> u32 {
        match self {
            Segment::PresentationComposition(pcs) => pcs.pts,
            Segment::WindowDefinition(wds) => wds.pts,
            Segment::PaletteDefinition(pds) => pds.pts,
            Segment::ObjectDefinition(ods) => ods.pts,
            Segment::End(es) => es.pts,
        }
    }

    /// A short name for log output.
    pub fn name(&self) -> &'static str {
        match self {
            Segment::PresentationComposition(_) => "PCS",
            Segment::WindowDefinition(_) => "WDS",
            Segment::PaletteDefinition(_) => "PDS",
            Segment::ObjectDefinition(_) => "ODS",
            Segment::End(_) => "END",
        }
    }
}

/// Defines the role of a PCS (and thereby the associated DS) within an epoch.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CompositionState {
    /// Indicates that the associated PCS (and the DS it belongs to) defines the start of a new
    /// epoch. As such, the associated DS should contain all other segments necessary to render
    /// a composition onto the screen.
    EpochStart,
    /// Similar to `EpochStart`, except used to refresh the screen with the current composition.
    /// That is, the associated DS should redefine the same windows, objects, and palettes as
    /// the `EpochStart` DS. This allows, for example, a player to seek past an `EpochStart` and
    /// land in the middle of an epoch, while still being able to show the relevant composition
    /// once the `AcquisitionPoint` is encountered.
    AcquisitionPoint,
    /// This updates the composition that is on the screen. This is typically used to clear the
    /// current composition from the screen by defining a PCS with no composition objects,
    /// thereby effectively closing out the current epoch. But other things like palette updates
    /// and object substitution within a window can also be done.
    Normal,
}

impl Default for CompositionState {
    fn default() -> Self { Self::EpochStart }
}

/// Defines this object's role in a possible multi-part object.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Sequence {
    /// This object is discrete and stands alone.
    Single,
    /// This object is the first portion in a multi-part object.
    First,
    /// This object is neither the first nor the last portion in a multi-part object.
    Continuation,
    /// This object is the last portion in a multi-part object.
    Last,
}

impl Sequence {

    /// Whether this fragment starts an object and therefore carries an [`ObjectHeader`].
    pub fn is_first(self) -> bool {
        matches!(self, Sequence::Single | Sequence::First)
    }

    /// Whether this fragment completes an object.
    pub fn is_last(self) -> bool {
        matches!(self, Sequence::Single | Sequence::Last)
    }
}

impl Default for Sequence {
    fn default() -> Self { Self::Single }
}

/// Defines a Presentation Composition Segment (PCS).
///
/// A PCS marks the beginning of a display set (DS).
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct PresentationCompositionSegment {
    /// The timestamp indicating when composition decoding should start. In practice, this is
    /// the time at which the composition is displayed. All segments within a DS typically have
    /// identical values here.
    pub pts: u32,
    /// The timestamp indicating when the composition should be displayed. In practice, this
    /// value is always zero.
    pub dts: u32,
    /// The width of the display in pixels. This value should be consistent within a
    /// presentation.
    pub width: u16,
    /// The height of the display in pixels. This value should be consistent within a
    /// presentation.
    pub height: u16,
    /// This value should be set to `0x10` and can typically be ignored.
    pub frame_rate: u8,
    pub composition_number: u16,
    pub composition_state: CompositionState,
    /// Set when this DS only updates the palette of the current composition.
    pub palette_update: bool,
    /// The palette that objects of this composition are drawn with.
    pub palette_id: u8,
    pub composition_objects: Vec<CompositionObject>,
}

/// Places an object into a window.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct CompositionObject {
    pub object_id: u16,
    pub window_id: u8,
    pub x: u16,
    pub y: u16,
    /// Set when this object must be shown even if subtitles are turned off.
    pub forced: bool,
    pub crop: Option<Crop>,
}

/// The visible region of an object, relative to its top-left corner.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Crop {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct WindowDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub windows: Vec<WindowDefinition>,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct WindowDefinition {
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct PaletteDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub id: u8,
    pub version: u8,
    pub entries: Vec<PaletteEntry>,
}

/// A single YCbCrA palette entry as stored in the stream.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct PaletteEntry {
    pub id: u8,
    pub y: u8,
    pub cr: u8,
    pub cb: u8,
    pub alpha: u8,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct ObjectDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub id: u16,
    pub version: u8,
    pub sequence: Sequence,
    /// Present on [`Sequence::Single`] and [`Sequence::First`] fragments only.
    pub header: Option<ObjectHeader>,
    /// The run-length encoded bytes carried by this fragment.
    pub data: Vec<u8>,
}

/// Describes a whole object. Only the first fragment of an object carries it.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct ObjectHeader {
    /// The number of run-length encoded bytes across all fragments of the object.
    pub data_length: u32,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct EndSegment {
    pub pts: u32,
    pub dts: u32,
}
