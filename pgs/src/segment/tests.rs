/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::{
    *,
    segmentread::ReadSegmentExt,
    segmentwrite::WriteSegmentExt,
};
use std::io::{Cursor, ErrorKind};
use rand::{thread_rng, Rng};

#[test]
fn test_pcs_cycle_no_co() {

    let mut rng = thread_rng();
    let segment = Segment::PresentationComposition(
        PresentationCompositionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            width: rng.gen(),
            height: rng.gen(),
            frame_rate: rng.gen(),
            composition_number: rng.gen(),
            composition_state: CompositionState::Normal,
            palette_update: false,
            palette_id: rng.gen(),
            composition_objects: vec![],
        }
    );

    cycle(&segment);
}

#[test]
fn test_pcs_cycle_co() {

    let mut rng = thread_rng();
    let segment = Segment::PresentationComposition(
        PresentationCompositionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            width: rng.gen(),
            height: rng.gen(),
            frame_rate: rng.gen(),
            composition_number: rng.gen(),
            composition_state: CompositionState::EpochStart,
            palette_update: true,
            palette_id: rng.gen(),
            composition_objects: vec![
                CompositionObject {
                    object_id: rng.gen(),
                    window_id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    forced: true,
                    crop: None,
                },
                CompositionObject {
                    object_id: rng.gen(),
                    window_id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    forced: false,
                    crop: Some(
                        Crop {
                            x: rng.gen(),
                            y: rng.gen(),
                            width: rng.gen(),
                            height: rng.gen(),
                        }
                    ),
                },
            ],
        }
    );

    cycle(&segment);
}

#[test]
fn test_wds_not_empty() {

    let mut rng = thread_rng();
    let segment = Segment::WindowDefinition(
        WindowDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            windows: vec![
                WindowDefinition {
                    id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    width: rng.gen(),
                    height: rng.gen(),
                },
                WindowDefinition {
                    id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    width: rng.gen(),
                    height: rng.gen(),
                },
            ],
        }
    );

    cycle(&segment);
}

#[test]
fn test_pds_not_empty() {

    let mut rng = thread_rng();
    let segment = Segment::PaletteDefinition(
        PaletteDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            id: rng.gen(),
            version: rng.gen(),
            entries: (0..=255).map(|id|
                PaletteEntry {
                    id,
                    y: rng.gen(),
                    cr: rng.gen(),
                    cb: rng.gen(),
                    alpha: rng.gen(),
                }
            ).collect(),
        }
    );

    cycle(&segment);
}

#[test]
fn test_ods_fragments() {

    let mut rng = thread_rng();
    let pts = rng.gen();
    let dts = rng.gen();
    let data = (0..200_000).map(|_| rng.gen()).collect::<Vec<u8>>();
    let fragments = split_object(pts, dts, 7, 1, 1920, 1080, &data);

    assert_eq!(fragments.len(), 4);
    assert_eq!(fragments[0].sequence, Sequence::First);
    assert_eq!(fragments[1].sequence, Sequence::Continuation);
    assert_eq!(fragments[2].sequence, Sequence::Continuation);
    assert_eq!(fragments[3].sequence, Sequence::Last);
    assert_eq!(fragments[0].header.as_ref().unwrap().data_length, 200_000);
    assert!(fragments[1..].iter().all(|fragment| fragment.header.is_none()));
    assert_eq!(
        fragments.iter().flat_map(|fragment| fragment.data.iter().copied()).collect::<Vec<u8>>(),
        data,
    );

    for fragment in fragments {
        cycle(&Segment::ObjectDefinition(fragment));
    }
}

#[test]
fn test_ods_single_fits_one_segment() {

    let fragments = split_object(0, 0, 1, 0, 4, 4, &[0x00, 0x04, 0x00, 0x00]);

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].sequence, Sequence::Single);

    cycle(&Segment::ObjectDefinition(fragments[0].clone()));
}

#[test]
fn test_es() {

    let mut rng = thread_rng();
    let segment = Segment::End(
        EndSegment {
            pts: rng.gen(),
            dts: rng.gen(),
        }
    );

    cycle(&segment);
}

#[test]
fn test_reader_walks_stream() {

    let segments = vec![
        Segment::PresentationComposition(PresentationCompositionSegment {
            pts: 900,
            width: 1920,
            height: 1080,
            ..Default::default()
        }),
        Segment::End(EndSegment { pts: 900, dts: 0 }),
    ];
    let buffer = write_all(&segments);
    let mut reader = SegmentReader::new(&buffer);

    assert_eq!(reader.next().unwrap().unwrap(), segments[0]);
    assert_eq!(reader.offset(), HEADER_SIZE + 11);
    assert_eq!(reader.next().unwrap().unwrap(), segments[1]);
    assert_eq!(reader.offset(), buffer.len());
    assert!(reader.next().is_none());
}

#[test]
fn test_reader_restarts_at_offset() {

    let segments = vec![
        Segment::End(EndSegment { pts: 1, dts: 0 }),
        Segment::End(EndSegment { pts: 2, dts: 0 }),
        Segment::End(EndSegment { pts: 3, dts: 0 }),
    ];
    let buffer = write_all(&segments);
    let mut reader = SegmentReader::new(&buffer);

    reader.next().unwrap().unwrap();

    let restarted = SegmentReader::at_offset(&buffer, reader.offset())
        .collect::<ReadResult<Vec<Segment>>>()
        .unwrap();

    assert_eq!(restarted, segments[1..]);
}

#[test]
fn test_reader_rejects_bad_magic() {

    let mut buffer = write_all(&[Segment::End(EndSegment::default())]);

    buffer[0] = b'X';

    match SegmentReader::new(&buffer).next() {
        Some(Err(ReadError::UnrecognizedMagicNumber { found })) => assert_eq!(found, 0x5847),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_reader_rejects_unknown_kind() {

    let mut buffer = write_all(&[Segment::End(EndSegment::default())]);

    buffer[10] = 0x42;

    assert!(matches!(
        SegmentReader::new(&buffer).next(),
        Some(Err(ReadError::UnrecognizedKind { kind: 0x42 })),
    ));
}

#[test]
fn test_reader_rejects_payload_overrun() {

    let mut buffer = write_all(&[
        Segment::WindowDefinition(WindowDefinitionSegment {
            windows: vec![WindowDefinition::default()],
            ..Default::default()
        }),
    ]);

    buffer.truncate(buffer.len() - 1);

    assert!(matches!(
        SegmentReader::new(&buffer).next(),
        Some(Err(ReadError::PayloadOverrun { declared: 10, remaining: 9 })),
    ));
}

#[test]
fn test_reader_rejects_truncated_header_and_fuses() {

    let mut buffer = write_all(&[Segment::End(EndSegment::default())]);

    buffer.extend_from_slice(&[0x50, 0x47, 0x00]);

    let mut reader = SegmentReader::new(&buffer);

    assert!(reader.next().unwrap().is_ok());
    assert!(matches!(reader.next(), Some(Err(ReadError::TruncatedHeader { remaining: 3 }))));
    assert!(reader.next().is_none());
}

#[test]
fn test_reader_rejects_short_payload() {

    let mut buffer = vec![];

    buffer.extend_from_slice(&[0x50, 0x47, 0, 0, 0, 0, 0, 0, 0, 0, 0x16, 0x00, 0x03]);
    buffer.extend_from_slice(&[0x07, 0x80, 0x04]);

    assert!(matches!(
        SegmentReader::new(&buffer).next(),
        Some(Err(ReadError::TruncatedPayload { kind: 0x16 })),
    ));
}

#[test]
fn test_reader_rejects_missing_composition_object() {

    let mut buffer = vec![];

    buffer.extend_from_slice(&[0x50, 0x47, 0, 0, 0, 0, 0, 0, 0, 0, 0x16, 0x00, 0x0F]);
    buffer.extend_from_slice(&[0x07, 0x80, 0x04, 0x38, 0x10, 0x00, 0x00, 0x80, 0x00, 0x00, 0x01]);
    buffer.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    assert!(matches!(
        SegmentReader::new(&buffer).next(),
        Some(Err(ReadError::TruncatedPayload { kind: 0x16 })),
    ));
}

#[test]
fn test_reader_rejects_short_object_length() {

    let mut buffer = vec![];

    buffer.extend_from_slice(&[0x50, 0x47, 0, 0, 0, 0, 0, 0, 0, 0, 0x15, 0x00, 0x0B]);
    buffer.extend_from_slice(&[0x00, 0x01, 0x00, 0xC0, 0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x01]);

    assert!(matches!(
        SegmentReader::new(&buffer).next(),
        Some(Err(ReadError::InvalidObjectDataLength { declared: 3 })),
    ));
}

#[test]
fn test_read_segment_eof() {

    let mut cursor = Cursor::new(Vec::<u8>::new());

    match cursor.read_segment() {
        Err(ReadError::IoError { source }) => assert_eq!(source.kind(), ErrorKind::UnexpectedEof),
        other => panic!("unexpected result: {:?}", other),
    }
}

fn write_all(segments: &[Segment]) -> Vec<u8> {

    let mut buffer = vec![];

    for segment in segments {
        buffer.write_segment(segment).unwrap();
    }

    buffer
}

fn cycle(segment: &Segment) {

    let mut buffer = vec![];

    buffer.write_segment(&segment).unwrap();

    let mut cursor = Cursor::new(buffer);
    let cycled_segment = cursor.read_segment().unwrap();

    assert_eq!(cycled_segment, *segment);
}
