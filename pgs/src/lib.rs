/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Presentation Graphics Stream (PGS) parsing and subtitle event reconstruction.
//!
//! # Overview
//!
//! PGS is the bitmap subtitle format used on Blu-ray discs and carried inside Matroska
//! containers. The stream is a flat sequence of segments that a decoder groups into display
//! sets, each one describing a single change to what is on screen.
//!
//! This crate turns such a stream into timed images in four stages:
//!
//! 1. [`segment`] reads individual segments from raw bytes.
//! 2. [`displayset`] groups segments into complete display sets while tracking the state that
//!    carries over from one composition to the next within an epoch.
//! 3. [`bitmap`] decompresses the run-length encoded object data into palette-indexed pixels.
//! 4. [`timeline`] pairs each visible composition with the composition that clears it and
//!    yields ordered [`SubtitleEvent`](timeline::SubtitleEvent) values.
//!
//! [`decode_events`] runs the whole chain over an in-memory stream.

pub mod bitmap;
pub mod displayset;
pub mod rgb;
pub mod segment;
pub mod timeline;

use bitmap::DecodeError;
use displayset::{DisplaySetsExt, ReadError as DisplaySetReadError};
use segment::SegmentReader;
use thiserror::Error as ThisError;
use timeline::{Timeline, TimelineBuilder};

/// The number of PTS/DTS clock ticks in one millisecond.
pub const TICKS_PER_MILLISECOND: u32 = 90;

/// The parsing-layer error type.
///
/// Any of these aborts the processing of the stream it was raised for.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("display set could not be read")]
    DisplaySetError {
        #[from]
        source: DisplaySetReadError,
    },
    #[error("object bitmap could not be decoded")]
    DecodeError {
        #[from]
        source: DecodeError,
    },
}

/// Broad classes of [`Error`] used when reporting failures.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The byte stream does not follow the segment grammar.
    MalformedStream,
    /// A fragmented object could not be reassembled.
    TruncatedObject,
    /// Run-length encoded pixel data did not match its declared dimensions.
    Decode,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DisplaySetError { source: DisplaySetReadError::TruncatedObject(_) } => {
                ErrorKind::TruncatedObject
            }
            Error::DisplaySetError { .. } => ErrorKind::MalformedStream,
            Error::DecodeError { .. } => ErrorKind::Decode,
        }
    }
}

/// Parses an entire PGS stream and reconstructs its subtitle events.
pub fn decode_events(data: &[u8]) -> Result<Timeline, Error> {

    let mut builder = TimelineBuilder::new();
    let mut display_sets = SegmentReader::new(data).display_sets();

    for display_set in &mut display_sets {
        builder.push(&display_set?)?;
    }

    let mut timeline = builder.finish();

    timeline.incomplete = display_sets.skipped();

    Ok(timeline)
}

/// Converts a PTS/DTS value into milliseconds.
pub fn ts_to_millis(ts: u32) -> u64 {
    ts as u64 / TICKS_PER_MILLISECOND as u64
}

/// Renders a PTS/DTS value as `HH:MM:SS.mmm` for diagnostics.
pub fn ts_to_timestamp(ts: u32) -> String {

    let millis = ts_to_millis(ts);

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1_000 % 60,
        millis % 1_000,
    )
}

#[cfg(test)]
mod tests {

    use super::*;
    use bitmap::{encode, Bitmap};
    use rand::{thread_rng, Rng};
    use segment::{
        split_object,
        CompositionObject,
        CompositionState,
        EndSegment,
        PaletteDefinitionSegment,
        PaletteEntry,
        PresentationCompositionSegment,
        Segment,
        WindowDefinition,
        WindowDefinitionSegment,
        WriteSegmentExt,
    };

    fn random_stream() -> Vec<u8> {

        let mut rng = thread_rng();
        let mut segments = vec![];
        let mut pts = 0;

        for number in 0..20 {

            pts += rng.gen_range(1..5) * 900;

            let shown = rng.gen_bool(0.6);
            let mut composition_objects = vec![];

            if shown {
                composition_objects.push(CompositionObject {
                    object_id: 0,
                    x: rng.gen_range(0..1000),
                    y: rng.gen_range(0..800),
                    ..Default::default()
                });
            }

            segments.push(Segment::PresentationComposition(PresentationCompositionSegment {
                pts,
                width: 1920,
                height: 1080,
                frame_rate: 0x10,
                composition_number: number,
                composition_state: if shown {
                    CompositionState::EpochStart
                } else {
                    CompositionState::Normal
                },
                composition_objects,
                ..Default::default()
            }));

            if shown {

                let width: u16 = rng.gen_range(1..400);
                let height: u16 = rng.gen_range(1..60);
                let pixels = (0..width as usize * height as usize)
                    .map(|_| rng.gen_range(0..4))
                    .collect();
                let data = encode(&Bitmap::new(width, height, pixels).unwrap());

                segments.push(Segment::WindowDefinition(WindowDefinitionSegment {
                    pts,
                    windows: vec![WindowDefinition { id: 0, x: 0, y: 0, width, height }],
                    ..Default::default()
                }));
                segments.push(Segment::PaletteDefinition(PaletteDefinitionSegment {
                    pts,
                    entries: (0..4)
                        .map(|id| PaletteEntry {
                            id,
                            y: rng.gen(),
                            cr: rng.gen(),
                            cb: rng.gen(),
                            alpha: rng.gen(),
                        })
                        .collect(),
                    ..Default::default()
                }));
                segments.extend(
                    split_object(pts, 0, 0, 0, width, height, &data)
                        .into_iter()
                        .map(Segment::ObjectDefinition),
                );
            }

            segments.push(Segment::End(EndSegment { pts, dts: 0 }));
        }

        let mut buffer = vec![];

        for segment in segments.iter() {
            buffer.write_segment(segment).unwrap();
        }

        buffer
    }

    #[test]
    fn test_decode_events_is_deterministic() {
        for _ in 0..20 {

            let stream = random_stream();
            let first = decode_events(&stream).unwrap();
            let second = decode_events(&stream).unwrap();

            assert_eq!(first, second);
            assert!(first.events.windows(2).all(|pair| pair[0].end <= pair[1].start));
        }
    }

    #[test]
    fn test_ts_to_timestamp() {
        assert_eq!(ts_to_timestamp(0), "00:00:00.000");
        assert_eq!(ts_to_timestamp(90), "00:00:00.001");
        assert_eq!(ts_to_timestamp(5_025_678 * 90), "01:23:45.678");
    }

    #[test]
    fn test_decode_events_empty_stream() {

        let timeline = decode_events(&[]).unwrap();

        assert!(timeline.events.is_empty());
        assert!(timeline.anomalies.is_empty());
    }

    #[test]
    fn test_error_kind_malformed() {

        let err = decode_events(b"XX\0\0\0\0\0\0\0\0\x80\0\0").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedStream);
    }
}
