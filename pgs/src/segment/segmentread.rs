/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

use super::{
    CompositionObject,
    Crop,
    CompositionState,
    EndSegment,
    ObjectDefinitionSegment,
    ObjectHeader,
    PaletteDefinitionSegment,
    PaletteEntry,
    PresentationCompositionSegment,
    Segment,
    Sequence,
    WindowDefinition,
    WindowDefinitionSegment,
    HEADER_SIZE,
    KIND_END,
    KIND_ODS,
    KIND_PCS,
    KIND_PDS,
    KIND_WDS,
    MAGIC_NUMBER,
};
use std::{
    io::{Cursor, Error as IoError, ErrorKind, Read},
    iter::FusedIterator,
};
use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for segment-reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// The error type for [ReadSegmentExt] and [SegmentReader].
///
/// Apart from `IoError`, every variant means the stream is malformed. No attempt is made to
/// resynchronize after one of them.
#[derive(ThisError, Debug)]
pub enum ReadError {
    #[error("segment IO error")]
    IoError {
        #[from]
        source: IoError,
    },
    #[error("segment has unrecognized magic number {found:#06X}")]
    UnrecognizedMagicNumber {
        found: u16,
    },
    #[error("segment has unrecognized kind {kind:#04X}")]
    UnrecognizedKind {
        kind: u8,
    },
    #[error("stream ends within a segment header ({remaining} bytes left)")]
    TruncatedHeader {
        remaining: usize,
    },
    #[error("segment declares {declared} payload bytes but only {remaining} remain")]
    PayloadOverrun {
        declared: usize,
        remaining: usize,
    },
    #[error("segment payload of kind {kind:#04X} is shorter than its contents")]
    TruncatedPayload {
        kind: u8,
    },
    #[error("presentation composition segment has unrecognized composition state {value:#04X}")]
    UnrecognizedCompositionState {
        value: u8,
    },
    #[error("presentation composition segment has unrecognized palette update flag {value:#04X}")]
    UnrecognizedPaletteUpdateFlag {
        value: u8,
    },
    #[error("composition object has unrecognized flags {value:#04X}")]
    UnrecognizedCompositionObjectFlags {
        value: u8,
    },
    #[error("unrecognized object definition sequence flag {value:#04X}")]
    UnrecognizedObjectSequenceFlag {
        value: u8,
    },
    #[error("object definition declares an invalid data length of {declared}")]
    InvalidObjectDataLength {
        declared: u32,
    },
}

/// Allows reading segments from a source.
pub trait ReadSegmentExt {
    /// Reads the next segment from a source.
    ///
    /// Reaching the end of the source yields an `IoError` of kind `UnexpectedEof`.
    fn read_segment(&mut self) -> ReadResult<Segment>;
}

impl<T: Read> ReadSegmentExt for T {

    fn read_segment(&mut self) -> ReadResult<Segment> {

        let header = read_header(self)?;
        let mut payload = vec![0u8; header.size];

        self.read_exact(&mut payload)?;

        parse_payload(&header, &payload)
    }
}

/// Reads segments out of an in-memory stream.
///
/// The reader is lazy and finite: it yields `None` once the input is exhausted on a segment
/// boundary. After the first error it yields nothing further. A new reader can be started at
/// any [`offset`](SegmentReader::offset) previously reported by another one.
#[derive(Clone, Debug)]
pub struct SegmentReader<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> SegmentReader<'a> {

    pub fn new(data: &'a [u8]) -> Self {
        Self::at_offset(data, 0)
    }

    pub fn at_offset(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            offset: offset.min(data.len()),
            failed: false,
        }
    }

    /// The byte offset of the next segment to be read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_next(&self) -> ReadResult<(Segment, usize)> {

        let input = &self.data[self.offset..];

        if input.len() < HEADER_SIZE {
            if input.len() >= 2 {
                let found = u16::from_be_bytes([input[0], input[1]]);
                if found != MAGIC_NUMBER {
                    return Err(ReadError::UnrecognizedMagicNumber { found })
                }
            }
            return Err(ReadError::TruncatedHeader { remaining: input.len() })
        }

        let header = read_header(&mut Cursor::new(input))?;
        let remaining = input.len() - HEADER_SIZE;

        if header.size > remaining {
            return Err(ReadError::PayloadOverrun { declared: header.size, remaining })
        }

        let segment = parse_payload(&header, &input[HEADER_SIZE..HEADER_SIZE + header.size])?;

        Ok((segment, HEADER_SIZE + header.size))
    }
}

impl<'a> Iterator for SegmentReader<'a> {

    type Item = ReadResult<Segment>;

    fn next(&mut self) -> Option<Self::Item> {

        if self.failed || self.offset >= self.data.len() {
            return None
        }

        match self.read_next() {
            Ok((segment, size)) => {
                self.offset += size;
                Some(Ok(segment))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl<'a> FusedIterator for SegmentReader<'a> {}

struct SegmentHeader {
    pts: u32,
    dts: u32,
    kind: u8,
    size: usize,
}

fn read_header<R: Read + ?Sized>(input: &mut R) -> ReadResult<SegmentHeader> {

    let found = input.read_u16::<BigEndian>()?;

    if found != MAGIC_NUMBER {
        return Err(ReadError::UnrecognizedMagicNumber { found })
    }

    let pts = input.read_u32::<BigEndian>()?;
    let dts = input.read_u32::<BigEndian>()?;
    let kind = input.read_u8()?;

    match kind {
        KIND_PDS | KIND_ODS | KIND_PCS | KIND_WDS | KIND_END => {}
        _ => return Err(ReadError::UnrecognizedKind { kind }),
    }

    let size = input.read_u16::<BigEndian>()? as usize;

    Ok(SegmentHeader { pts, dts, kind, size })
}

fn parse_payload(header: &SegmentHeader, payload: &[u8]) -> ReadResult<Segment> {

    let pts = header.pts;
    let dts = header.dts;
    let kind = header.kind;
    let segment = match kind {
        KIND_PDS => parse_pds(pts, dts, payload).map(Segment::PaletteDefinition),
        KIND_ODS => parse_ods(pts, dts, payload).map(Segment::ObjectDefinition),
        KIND_PCS => parse_pcs(pts, dts, payload).map(Segment::PresentationComposition),
        KIND_WDS => parse_wds(pts, dts, payload).map(Segment::WindowDefinition),
        KIND_END => Ok(Segment::End(EndSegment { pts, dts })),
        _ => Err(ReadError::UnrecognizedKind { kind }),
    };

    // Payloads are parsed from memory, so running out of bytes can only mean the payload is
    // too short for what it claims to contain.
    segment.map_err(|err| match err {
        ReadError::IoError { source } if source.kind() == ErrorKind::UnexpectedEof => {
            ReadError::TruncatedPayload { kind }
        }
        err => err,
    })
}

fn parse_pcs(
    pts: u32,
    dts: u32,
    payload: &[u8],
) -> ReadResult<PresentationCompositionSegment> {

    let mut input = Cursor::new(payload);
    let width = input.read_u16::<BigEndian>()?;
    let height = input.read_u16::<BigEndian>()?;
    let frame_rate = input.read_u8()?;
    let composition_number = input.read_u16::<BigEndian>()?;
    let composition_state = match input.read_u8()? {
        0x00 => CompositionState::Normal,
        0x40 => CompositionState::AcquisitionPoint,
        0x80 => CompositionState::EpochStart,
        value => return Err(ReadError::UnrecognizedCompositionState { value }),
    };
    let palette_update = match input.read_u8()? {
        0x00 => false,
        0x80 => true,
        value => return Err(ReadError::UnrecognizedPaletteUpdateFlag { value }),
    };
    let palette_id = input.read_u8()?;
    let comp_obj_count = input.read_u8()? as usize;
    let mut composition_objects = Vec::with_capacity(comp_obj_count);

    for _ in 0..comp_obj_count {

        let object_id = input.read_u16::<BigEndian>()?;
        let window_id = input.read_u8()?;
        let flags = input.read_u8()?;

        if flags & !0xC0 != 0 {
            return Err(ReadError::UnrecognizedCompositionObjectFlags { value: flags })
        }

        let x = input.read_u16::<BigEndian>()?;
        let y = input.read_u16::<BigEndian>()?;

        // Some discs (the U.S. release of Final Fantasy VII: Advent Children Complete among
        // them) flag an object as cropped and then end the payload.
        let crop = if flags & 0x80 != 0 && remaining(&input) >= 8 {
            Some(
                Crop {
                    x: input.read_u16::<BigEndian>()?,
                    y: input.read_u16::<BigEndian>()?,
                    width: input.read_u16::<BigEndian>()?,
                    height: input.read_u16::<BigEndian>()?,
                }
            )
        } else {
            None
        };

        composition_objects.push(
            CompositionObject {
                object_id,
                window_id,
                x,
                y,
                forced: flags & 0x40 != 0,
                crop,
            }
        );
    }

    Ok(
        PresentationCompositionSegment {
            pts,
            dts,
            width,
            height,
            frame_rate,
            composition_number,
            composition_state,
            palette_update,
            palette_id,
            composition_objects,
        }
    )
}

fn parse_wds(
    pts: u32,
    dts: u32,
    payload: &[u8],
) -> ReadResult<WindowDefinitionSegment> {

    let mut input = Cursor::new(payload);
    let count = input.read_u8()? as usize;
    let mut windows = Vec::with_capacity(count);

    for _ in 0..count {
        windows.push(
            WindowDefinition {
                id: input.read_u8()?,
                x: input.read_u16::<BigEndian>()?,
                y: input.read_u16::<BigEndian>()?,
                width: input.read_u16::<BigEndian>()?,
                height: input.read_u16::<BigEndian>()?,
            }
        );
    }

    Ok(
        WindowDefinitionSegment {
            pts,
            dts,
            windows,
        }
    )
}

fn parse_pds(
    pts: u32,
    dts: u32,
    payload: &[u8],
) -> ReadResult<PaletteDefinitionSegment> {

    let mut input = Cursor::new(payload);
    let id = input.read_u8()?;
    let version = input.read_u8()?;
    let count = (payload.len() - 2) / 5;
    let mut entries = Vec::with_capacity(count);

    for _ in 0..count {

        let id = input.read_u8()?;
        let y = input.read_u8()?;
        let cr = input.read_u8()?;
        let cb = input.read_u8()?;
        let alpha = input.read_u8()?;

        entries.push(PaletteEntry { id, y, cr, cb, alpha });
    }

    Ok(
        PaletteDefinitionSegment {
            pts,
            dts,
            id,
            version,
            entries,
        }
    )
}

fn parse_ods(
    pts: u32,
    dts: u32,
    payload: &[u8],
) -> ReadResult<ObjectDefinitionSegment> {

    let mut input = Cursor::new(payload);
    let id = input.read_u16::<BigEndian>()?;
    let version = input.read_u8()?;
    let sequence = match input.read_u8()? {
        0xC0 => Sequence::Single,
        0x80 => Sequence::First,
        0x40 => Sequence::Last,
        0x00 => Sequence::Continuation,
        value => return Err(ReadError::UnrecognizedObjectSequenceFlag { value }),
    };
    let header = if sequence.is_first() {

        // The declared length also counts the four bytes of width and height.
        let declared = input.read_u24::<BigEndian>()?;

        if declared < 4 {
            return Err(ReadError::InvalidObjectDataLength { declared })
        }

        Some(
            ObjectHeader {
                data_length: declared - 4,
                width: input.read_u16::<BigEndian>()?,
                height: input.read_u16::<BigEndian>()?,
            }
        )
    } else {
        None
    };
    let data = payload[input.position() as usize..].to_vec();

    Ok(
        ObjectDefinitionSegment {
            pts,
            dts,
            id,
            version,
            sequence,
            header,
            data,
        }
    )
}

fn remaining(input: &Cursor<&[u8]>) -> usize {
    input.get_ref().len().saturating_sub(input.position() as usize)
}
