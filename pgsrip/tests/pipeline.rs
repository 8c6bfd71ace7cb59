/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use pgs::{
    bitmap::{encode, Bitmap},
    rgb::{ycbcr_pixel, RgbPixel},
    segment::{
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
    },
    timeline::Raster,
    ErrorKind,
};
use pgsrip::{
    output::Decision,
    recognize::{RecognitionError, RecognitionResult, Recognizer},
    rip::{MediaFilter, Rejection, TrackError},
    Language,
    Options,
    RipEvent,
    Ripper,
    Summary,
    SubtitleTypeFilter,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::channel,
};
use tempfile::tempdir;

const SECOND: u32 = 90_000;

/// Reads captions back by their width.
struct ScriptedRecognizer;

impl Recognizer for ScriptedRecognizer {
    fn recognize(&self, raster: &Raster, language: Language) -> RecognitionResult<String> {

        assert_eq!(language, Language::parse("en").unwrap());

        match raster.rect.width {
            40 => Ok("Hello there.".to_string()),
            60 => Ok("General\nKenobi!".to_string()),
            _ => Err(RecognitionError::EmptyImage),
        }
    }
}

#[derive(Default)]
struct Stream {
    data: Vec<u8>,
    number: u16,
}

impl Stream {

    fn write(&mut self, segment: Segment) {
        self.data.write_segment(&segment).unwrap();
    }

    fn composition(&mut self, pts: u32, state: CompositionState, objects: Vec<CompositionObject>) {

        self.number += 1;
        self.write(Segment::PresentationComposition(
            PresentationCompositionSegment {
                pts,
                dts: pts,
                width: 1920,
                height: 1080,
                frame_rate: 0x10,
                composition_number: self.number,
                composition_state: state,
                palette_update: false,
                palette_id: 0,
                composition_objects: objects,
            }
        ));
        self.write(Segment::WindowDefinition(
            WindowDefinitionSegment {
                pts,
                dts: pts,
                windows: vec![WindowDefinition { id: 0, x: 0, y: 800, width: 1920, height: 200 }],
            }
        ));
    }

    fn end(&mut self, pts: u32) {
        self.write(Segment::End(EndSegment { pts, dts: pts }));
    }

    fn show(&mut self, pts: u32, version: u8, width: u16) -> &mut Self {

        let white = ycbcr_pixel(RgbPixel { red: 255, green: 255, blue: 255 });
        let bitmap = Bitmap::new(width, 10, vec![1; width as usize * 10]).unwrap();

        self.composition(
            pts,
            CompositionState::EpochStart,
            vec![
                CompositionObject {
                    object_id: 0,
                    window_id: 0,
                    x: 200,
                    y: 900,
                    ..Default::default()
                },
            ],
        );
        self.write(Segment::PaletteDefinition(
            PaletteDefinitionSegment {
                pts,
                dts: pts,
                id: 0,
                version: 0,
                entries: vec![
                    PaletteEntry { id: 1, y: white.y, cr: white.cr, cb: white.cb, alpha: 255 },
                ],
            }
        ));
        for ods in split_object(pts, pts, 0, version, width, 10, &encode(&bitmap)) {
            self.write(Segment::ObjectDefinition(ods));
        }
        self.end(pts);
        self
    }

    fn clear(&mut self, pts: u32) -> &mut Self {
        self.composition(pts, CompositionState::Normal, vec![]);
        self.end(pts);
        self
    }
}

fn dialogue() -> Vec<u8> {

    let mut stream = Stream::default();

    stream
        .show(0, 0, 40)
        .show(SECOND, 1, 40)
        .clear(2 * SECOND)
        .show(3 * SECOND, 0, 60)
        .clear(4 * SECOND)
        .show(5 * SECOND, 0, 80)
        .clear(6 * SECOND);

    stream.data
}

const DIALOGUE_SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello there.\n\n\
    2\n00:00:03,000 --> 00:00:04,000\nGeneral\nKenobi!\n\n";

fn options() -> Options {
    Options { max_workers: 2, recognition_workers: 2, ..Default::default() }
}

fn rip(options: Options, paths: &[PathBuf]) -> (Summary, Vec<RipEvent>) {

    let (sender, receiver) = channel();
    let ripper = Ripper::new(options, Box::new(ScriptedRecognizer)).with_events(sender);
    let summary = ripper.rip(paths);

    drop(ripper);

    (summary, receiver.iter().collect())
}

fn write_sup(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_second_run_is_unchanged() {

    let dir = tempdir().unwrap();
    let sup = write_sup(dir.path(), "movie.en.sup", &dialogue());
    let srt = dir.path().join("movie.en.srt");
    let (summary, _) = rip(options(), &[sup.clone()]);

    assert_eq!(
        summary,
        Summary { collected: 1, attempted: 1, written: 1, ..Default::default() },
    );
    assert_eq!(fs::read_to_string(&srt).unwrap(), DIALOGUE_SRT);

    let (summary, events) = rip(options(), &[sup]);

    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.written, 0);
    assert_eq!(fs::read_to_string(&srt).unwrap(), DIALOGUE_SRT);
    assert!(events.iter().any(|event| matches!(
        event,
        RipEvent::TrackFinished { result: Ok(Decision::Unchanged), .. },
    )));
}

#[test]
fn test_existing_output_is_respected() {

    let dir = tempdir().unwrap();
    let sup = write_sup(dir.path(), "movie.en.sup", &dialogue());
    let srt = dir.path().join("movie.en.srt");

    fs::write(&srt, "edited by hand\n").unwrap();

    let (summary, _) = rip(options(), &[sup.clone()]);

    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read_to_string(&srt).unwrap(), "edited by hand\n");

    let (summary, _) = rip(Options { overwrite: true, ..options() }, &[sup]);

    assert_eq!(summary.written, 1);
    assert_eq!(fs::read_to_string(&srt).unwrap(), DIALOGUE_SRT);
}

#[test]
fn test_types_are_named_and_filtered() {

    let dir = tempdir().unwrap();
    let full = write_sup(dir.path(), "movie.en.sup", &dialogue());
    let forced = write_sup(dir.path(), "movie.en.forced.sup", &dialogue());
    let (summary, _) = rip(options(), &[full.clone(), forced.clone()]);

    assert_eq!(summary.written, 2);
    assert!(dir.path().join("movie.en.srt").exists());
    assert!(dir.path().join("movie.en.forced.srt").exists());

    let (summary, events) = rip(
        Options { type_filter: SubtitleTypeFilter::FullOnly, ..options() },
        &[full, forced],
    );

    assert_eq!(summary.collected, 2);
    assert_eq!(summary.attempted, 1);
    assert!(events.iter().any(|event| matches!(
        event,
        RipEvent::TrackRejected { rejection: Rejection::TypeNotAccepted, .. },
    )));
}

#[test]
fn test_media_filtering() {

    let dir = tempdir().unwrap();
    let sup = write_sup(dir.path(), "movie.en.sup", &dialogue());
    let options = Options {
        languages: [Language::parse("de").unwrap()].into_iter().collect(),
        ..options()
    };
    let (summary, events) = rip(options, &[
        sup,
        dir.path().join("missing.en.sup"),
        write_sup(dir.path(), "notes.txt", b"hello"),
    ]);

    assert_eq!(
        summary,
        Summary { filtered: 1, discarded: 2, ..Default::default() },
    );
    assert!(matches!(
        events[0],
        RipEvent::MediaFiltered { filter: MediaFilter::NoAcceptedLanguage, .. },
    ));
    assert!(!dir.path().join("movie.en.srt").exists());
}

#[test]
fn test_broken_track_does_not_stop_batch() {

    let dir = tempdir().unwrap();
    let broken = write_sup(dir.path(), "broken.en.sup", b"PG this is not a stream");
    let good = write_sup(dir.path(), "good.en.sup", &dialogue());
    let (summary, events) = rip(options(), &[broken, good]);

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 1);
    assert!(!dir.path().join("broken.en.srt").exists());
    assert!(dir.path().join("good.en.srt").exists());

    let kind = events.iter().find_map(|event| match event {
        RipEvent::TrackFinished { result: Err(TrackError::StreamError { source }), .. } => {
            Some(source.kind())
        }
        _ => None,
    });

    assert_eq!(kind, Some(ErrorKind::MalformedStream));
}

#[test]
fn test_fragmented_objects() {

    let dir = tempdir().unwrap();
    let mut stream = Stream::default();

    // Noise does not compress, so this object needs several fragments.
    let width = 2_000_u16;
    let pixels = (0..width as usize * 100).map(|i| (i % 7) as u8 + 1).collect::<Vec<u8>>();
    let bitmap = Bitmap::new(width, 100, pixels).unwrap();
    let data = encode(&bitmap);
    let fragments = split_object(0, 0, 0, 0, width, 100, &data);

    assert!(fragments.len() > 1);

    stream.composition(
        0,
        CompositionState::EpochStart,
        vec![CompositionObject { object_id: 0, ..Default::default() }],
    );
    stream.write(Segment::PaletteDefinition(PaletteDefinitionSegment::default()));
    for ods in fragments {
        stream.write(Segment::ObjectDefinition(ods));
    }
    stream.end(0);
    stream.clear(SECOND);

    let sup = write_sup(dir.path(), "noise.en.sup", &stream.data);
    let (summary, _) = rip(options(), &[sup]);

    // The caption is recognized as nothing, which still makes a valid, empty file.
    assert_eq!(summary.written, 1);
    assert_eq!(fs::read_to_string(dir.path().join("noise.en.srt")).unwrap(), "");
}
