/*
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * Copyright 2021 William Swartzendruber
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use super::{
    CompositionState,
    ObjectDefinitionSegment,
    ObjectHeader,
    PaletteDefinitionSegment,
    PresentationCompositionSegment,
    Segment,
    Sequence,
    WindowDefinitionSegment,
    KIND_END,
    KIND_ODS,
    KIND_PCS,
    KIND_PDS,
    KIND_WDS,
    MAGIC_NUMBER,
};
use std::io::{
    Error as IoError,
    Write,
};
use byteorder::{BigEndian, WriteBytesExt};
use thiserror::Error as ThisError;

/// The most RLE bytes a first (or single) object fragment can carry.
pub const FIRST_FRAGMENT_DATA_SIZE: usize = 0xFFFF - 11;

/// The most RLE bytes a continuation or last object fragment can carry.
pub const NEXT_FRAGMENT_DATA_SIZE: usize = 0xFFFF - 4;

/// A specialized [`Result`](std::result::Result) type for segment-writing operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// The error type for [WriteSegmentExt].
///
/// Errors are caused by either invalid state or by an underlying I/O error.
#[derive(ThisError, Debug)]
pub enum WriteError {
    /// The [`Segment`] could not be written because of an underlying I/O error.
    #[error("segment IO error")]
    IoError {
        /// The underlying I/O error.
        #[from]
        source: IoError,
    },
    /// The [`Segment`] ([`PresentationCompositionSegment`]) being written has more than 255
    /// composition objects.
    #[error("too many composition objects in presentation composition segment")]
    TooManyCompositionObjects,
    /// The [`Segment`] ([`WindowDefinitionSegment`]) being written has more than 255 window
    /// definitions.
    #[error("too many window definitions")]
    TooManyWindowDefinitions,
    /// The [`Segment`] ([`ObjectDefinitionSegment`]) being written declares more than
    /// 16,777,211 compressed bytes of data.
    #[error("object data is too large")]
    ObjectDataTooLarge,
    /// A first or single [`ObjectDefinitionSegment`] is missing its [`ObjectHeader`].
    #[error("first object fragment has no header")]
    MissingObjectHeader,
    /// The payload does not fit the 16-bit size field.
    #[error("segment payload of {size} bytes is too large")]
    PayloadTooLarge {
        size: usize,
    },
}

/// Allows writing segments to a destination.
pub trait WriteSegmentExt {
    /// Writes a segment to a destination.
    fn write_segment(&mut self, segment: &Segment) -> WriteResult<()>;
}

impl<T> WriteSegmentExt for T where
    T: Write,
{

    fn write_segment(&mut self, segment: &Segment) -> WriteResult<()> {

        let (pts, dts, kind, payload) = match &segment {
            Segment::PresentationComposition(pcs) => (pcs.pts, pcs.dts, KIND_PCS, generate_pcs(pcs)?),
            Segment::WindowDefinition(wds) => (wds.pts, wds.dts, KIND_WDS, generate_wds(wds)?),
            Segment::PaletteDefinition(pds) => (pds.pts, pds.dts, KIND_PDS, generate_pds(pds)?),
            Segment::ObjectDefinition(ods) => (ods.pts, ods.dts, KIND_ODS, generate_ods(ods)?),
            Segment::End(es) => (es.pts, es.dts, KIND_END, vec![]),
        };

        if payload.len() > 0xFFFF {
            return Err(WriteError::PayloadTooLarge { size: payload.len() })
        }

        self.write_u16::<BigEndian>(MAGIC_NUMBER)?;
        self.write_u32::<BigEndian>(pts)?;
        self.write_u32::<BigEndian>(dts)?;
        self.write_u8(kind)?;
        self.write_u16::<BigEndian>(payload.len() as u16)?;
        self.write_all(&payload)?;

        Ok(())
    }
}

/// Splits the RLE data of one object into as many object definition segments as needed.
pub fn split_object(
    pts: u32,
    dts: u32,
    id: u16,
    version: u8,
    width: u16,
    height: u16,
    data: &[u8],
) -> Vec<ObjectDefinitionSegment> {

    let header = ObjectHeader {
        data_length: data.len() as u32,
        width,
        height,
    };

    if data.len() <= FIRST_FRAGMENT_DATA_SIZE {
        return vec![
            ObjectDefinitionSegment {
                pts,
                dts,
                id,
                version,
                sequence: Sequence::Single,
                header: Some(header),
                data: data.to_vec(),
            }
        ]
    }

    let mut segments = vec![
        ObjectDefinitionSegment {
            pts,
            dts,
            id,
            version,
            sequence: Sequence::First,
            header: Some(header),
            data: data[..FIRST_FRAGMENT_DATA_SIZE].to_vec(),
        }
    ];
    let mut rest = &data[FIRST_FRAGMENT_DATA_SIZE..];

    while rest.len() > NEXT_FRAGMENT_DATA_SIZE {
        segments.push(
            ObjectDefinitionSegment {
                pts,
                dts,
                id,
                version,
                sequence: Sequence::Continuation,
                header: None,
                data: rest[..NEXT_FRAGMENT_DATA_SIZE].to_vec(),
            }
        );
        rest = &rest[NEXT_FRAGMENT_DATA_SIZE..];
    }

    segments.push(
        ObjectDefinitionSegment {
            pts,
            dts,
            id,
            version,
            sequence: Sequence::Last,
            header: None,
            data: rest.to_vec(),
        }
    );

    segments
}

fn generate_pcs(pcs: &PresentationCompositionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u16::<BigEndian>(pcs.width)?;
    payload.write_u16::<BigEndian>(pcs.height)?;
    payload.write_u8(pcs.frame_rate)?;
    payload.write_u16::<BigEndian>(pcs.composition_number)?;
    payload.write_u8(
        match pcs.composition_state {
            CompositionState::Normal => 0x00,
            CompositionState::AcquisitionPoint => 0x40,
            CompositionState::EpochStart => 0x80,
        }
    )?;
    payload.write_u8(if pcs.palette_update { 0x80 } else { 0x00 })?;
    payload.write_u8(pcs.palette_id)?;

    if pcs.composition_objects.len() <= 255 {
        payload.write_u8(pcs.composition_objects.len() as u8)?;
    } else {
        return Err(WriteError::TooManyCompositionObjects)
    }

    for comp_obj in &pcs.composition_objects {

        let mut flags = 0x00;

        if comp_obj.crop.is_some() {
            flags |= 0x80;
        }
        if comp_obj.forced {
            flags |= 0x40;
        }

        payload.write_u16::<BigEndian>(comp_obj.object_id)?;
        payload.write_u8(comp_obj.window_id)?;
        payload.write_u8(flags)?;
        payload.write_u16::<BigEndian>(comp_obj.x)?;
        payload.write_u16::<BigEndian>(comp_obj.y)?;

        if let Some(crop) = &comp_obj.crop {
            payload.write_u16::<BigEndian>(crop.x)?;
            payload.write_u16::<BigEndian>(crop.y)?;
            payload.write_u16::<BigEndian>(crop.width)?;
            payload.write_u16::<BigEndian>(crop.height)?;
        }
    }

    Ok(payload)
}

fn generate_wds(wds: &WindowDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    if wds.windows.len() <= 255 {
        payload.write_u8(wds.windows.len() as u8)?;
    } else {
        return Err(WriteError::TooManyWindowDefinitions)
    }

    for window in wds.windows.iter() {
        payload.write_u8(window.id)?;
        payload.write_u16::<BigEndian>(window.x)?;
        payload.write_u16::<BigEndian>(window.y)?;
        payload.write_u16::<BigEndian>(window.width)?;
        payload.write_u16::<BigEndian>(window.height)?;
    }

    Ok(payload)
}

fn generate_pds(pds: &PaletteDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u8(pds.id)?;
    payload.write_u8(pds.version)?;

    for entry in &pds.entries {
        payload.write_u8(entry.id)?;
        payload.write_u8(entry.y)?;
        payload.write_u8(entry.cr)?;
        payload.write_u8(entry.cb)?;
        payload.write_u8(entry.alpha)?;
    }

    Ok(payload)
}

fn generate_ods(ods: &ObjectDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u16::<BigEndian>(ods.id)?;
    payload.write_u8(ods.version)?;
    payload.write_u8(
        match ods.sequence {
            Sequence::Single => 0xC0,
            Sequence::First => 0x80,
            Sequence::Continuation => 0x00,
            Sequence::Last => 0x40,
        }
    )?;

    if ods.sequence.is_first() {

        let header = ods.header.as_ref().ok_or(WriteError::MissingObjectHeader)?;

        if header.data_length <= 16_777_211 {
            payload.write_u24::<BigEndian>(header.data_length + 4)?;
        } else {
            return Err(WriteError::ObjectDataTooLarge)
        }

        payload.write_u16::<BigEndian>(header.width)?;
        payload.write_u16::<BigEndian>(header.height)?;
    }

    payload.write_all(&ods.data)?;

    Ok(payload)
}
