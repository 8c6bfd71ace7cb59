/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Runs batches: collects media, selects tracks and turns each selected track into a file.
//!
//! # Overview
//!
//! A [`Ripper`] first opens every given path. Media that cannot be opened is discarded and
//! media rejected by the age or language settings is filtered; neither stops the batch. The
//! tracks of the remaining media go through [`select_tracks`], and every selected track
//! becomes a job with an output path no other job shares.
//!
//! Jobs are taken from a shared queue by up to `max_workers` threads. Each job runs
//! [`rip_track`]: the stream is extracted, parsed into a timeline, its events are recognized
//! (up to `recognition_workers` at a time) and the resulting SubRip file is handed to
//! [`write_output`]. Whatever happens is published as a [`RipEvent`] and counted in the
//! returned [`Summary`].


use super::{
    classify::SubtitleType,
    language::Language,
    media::{open_media, CollectionError, ExtractError, MediaSource, TrackInfo},
    options::Options,
    output::{file_age, precheck, target_path, write_output, Decision, OutputError},
    recognize::Recognizer,
    srt::{entries, serialize, Cue},
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Sender},
        Arc,
    },
    thread,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use pgs::{
    decode_events,
    timeline::{Anomaly, SubtitleEvent},
    ts_to_timestamp,
    Error as PgsError,
};
use thiserror::Error as ThisError;

/// A selected track could not be turned into a file.
#[derive(ThisError, Debug)]
pub enum TrackError {
    #[error("stream could not be extracted")]
    ExtractError {
        #[from]
        source: ExtractError,
    },
    #[error("stream could not be parsed ({:?})", .source.kind())]
    StreamError {
        #[from]
        source: PgsError,
    },
    #[error("output could not be written")]
    OutputError {
        #[from]
        source: OutputError,
    },
}

pub type TrackResult<T> = Result<T, TrackError>;

/// Why a media file was left out of a batch.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MediaFilter {
    /// It was last modified longer ago than the configured age.
    TooOld,
    /// None of its tracks is in an accepted language.
    NoAcceptedLanguage,
}

/// Why a track was not selected.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Rejection {
    UnknownLanguage,
    LanguageNotAccepted,
    TypeNotAccepted,
    /// A track of the same language and type was selected already.
    Duplicate,
    /// Another media file already claimed the same output path.
    TargetClaimed,
}

/// Progress of a batch, as it happens.
#[derive(Debug)]
pub enum RipEvent {
    MediaCollected {
        path: PathBuf,
        tracks: usize,
    },
    MediaFiltered {
        path: PathBuf,
        filter: MediaFilter,
    },
    MediaDiscarded {
        path: PathBuf,
        error: CollectionError,
    },
    TrackRejected {
        path: PathBuf,
        track: u64,
        rejection: Rejection,
    },
    TrackStarted {
        path: PathBuf,
        track: u64,
        target: PathBuf,
    },
    TrackFinished {
        path: PathBuf,
        track: u64,
        target: PathBuf,
        result: TrackResult<Decision>,
    },
}

/// The counts of a finished batch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub collected: usize,
    pub filtered: usize,
    pub discarded: usize,
    pub attempted: usize,
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {

    fn record(&mut self, result: &TrackResult<Decision>) {
        match result {
            Ok(Decision::Written) => self.written += 1,
            Ok(Decision::Unchanged) => self.unchanged += 1,
            Ok(Decision::SkippedExisting) | Ok(Decision::SkippedYoung) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} media collected, {} filtered, {} discarded; \
             {} tracks attempted: {} written, {} unchanged, {} skipped, {} failed",
            self.collected,
            self.filtered,
            self.discarded,
            self.attempted,
            self.written,
            self.unchanged,
            self.skipped,
            self.failed,
        )
    }
}

/// A track chosen for ripping, with where its output goes.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub track: TrackInfo,
    pub language: Language,
    pub subtitle_type: SubtitleType,
    pub target: PathBuf,
}

/// The outcome of [`select_tracks`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackSelection {
    pub selected: Vec<Selection>,
    pub rejected: Vec<(u64, Rejection)>,
}

/// Chooses the tracks of one media file to rip, in track order.
pub fn select_tracks(base: &Path, tracks: &[TrackInfo], options: &Options) -> TrackSelection {

    let mut ordered = tracks.iter().collect::<Vec<&TrackInfo>>();
    let mut counts = HashMap::<(Language, SubtitleType), usize>::new();
    let mut picked = Vec::new();
    let mut rejected = Vec::new();

    ordered.sort_by_key(|track| track.id);

    for track in ordered {

        let language = match track.language {
            Some(language) => language,
            None => {
                rejected.push((track.id, Rejection::UnknownLanguage));
                continue
            }
        };

        if !options.accepts_language(language) {
            rejected.push((track.id, Rejection::LanguageNotAccepted));
            continue
        }

        let subtitle_type = track.subtitle_type();

        if !options.type_filter.accepts(subtitle_type) {
            rejected.push((track.id, Rejection::TypeNotAccepted));
            continue
        }

        let count = counts.entry((language, subtitle_type)).or_insert(0);

        if options.one_per_lang && *count > 0 {
            rejected.push((track.id, Rejection::Duplicate));
            continue
        }

        picked.push((track, language, subtitle_type, *count));
        *count += 1;
    }

    let mut types = HashMap::<Language, HashSet<SubtitleType>>::new();

    for &(_, language, subtitle_type, _) in picked.iter() {
        types.entry(language).or_default().insert(subtitle_type);
    }

    let selected = picked
        .into_iter()
        .map(|(track, language, subtitle_type, number)| {
            let single_type = types.get(&language).map_or(true, |types| types.len() == 1);
            Selection {
                track: track.clone(),
                language,
                subtitle_type,
                target: target_path(
                    base,
                    number,
                    language,
                    subtitle_type,
                    single_type,
                    &options.extension,
                ),
            }
        })
        .collect();

    TrackSelection { selected, rejected }
}

/// Recognizes every event of a timeline, returning the texts in event order.
///
/// Up to `workers` events are in recognition at once. An event that cannot be recognized
/// yields empty text.
pub fn recognize_events(
    events: &[SubtitleEvent],
    language: Language,
    recognizer: &dyn Recognizer,
    workers: usize,
) -> Vec<String> {

    let workers = workers.clamp(1, events.len().max(1));
    let next = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel::<(usize, String)>();

    thread::scope(|scope| {
        for _ in 0..workers {

            let sender = sender.clone();
            let next = &next;

            scope.spawn(move || loop {

                let index = next.fetch_add(1, Ordering::Relaxed);
                let event = match events.get(index) {
                    Some(event) => event,
                    None => break,
                };
                let text = match recognizer.recognize(&event.render(), language) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(
                            "event at {} could not be recognized: {}",
                            ts_to_timestamp(event.start),
                            error,
                        );
                        String::new()
                    }
                };

                if sender.send((index, text)).is_err() {
                    break
                }
            });
        }
    });

    drop(sender);

    let mut texts = vec![String::new(); events.len()];

    for (index, text) in receiver {
        texts[index] = text;
    }

    texts
}

/// Turns one selected track into its output file.
pub fn rip_track(
    media: &dyn MediaSource,
    selection: &Selection,
    options: &Options,
    recognizer: &dyn Recognizer,
) -> TrackResult<Decision> {

    if let Some(decision) = precheck(&selection.target, options)? {
        return Ok(decision)
    }

    let data = media.elementary_stream(&selection.track)?;
    let timeline = decode_events(&data)?;

    for anomaly in timeline.anomalies.iter() {
        match anomaly {
            Anomaly::Dropped { pts, reason } => {
                debug!("dropped display set at {}: {:?}", ts_to_timestamp(*pts), reason);
            }
            Anomaly::Unterminated { start } => {
                debug!("event at {} has no end", ts_to_timestamp(*start));
            }
        }
    }
    if timeline.incomplete > 0 {
        warn!(
            "{}: {} incomplete display sets skipped",
            selection.target.display(),
            timeline.incomplete,
        );
    }

    let texts = recognize_events(
        &timeline.events,
        selection.language,
        recognizer,
        options.recognition_workers,
    );
    let cues = timeline.events
        .iter()
        .zip(texts)
        .map(|(event, text)| Cue { start: event.start_ms(), end: event.end_ms(), text });
    let entries = entries(cues);

    debug!(
        "{}: {} events, {} entries",
        selection.target.display(),
        timeline.events.len(),
        entries.len(),
    );

    Ok(write_output(&selection.target, &serialize(&entries), options)?)
}

#[derive(Debug)]
struct Job {
    media: Arc<dyn MediaSource>,
    selection: Selection,
}

/// Rips batches of media files.
pub struct Ripper {
    options: Options,
    recognizer: Box<dyn Recognizer>,
    events: Option<Mutex<Sender<RipEvent>>>,
}

impl Ripper {

    pub fn new(options: Options, recognizer: Box<dyn Recognizer>) -> Self {
        Self { options, recognizer, events: None }
    }

    /// Publishes progress on `sender` while ripping.
    pub fn with_events(mut self, sender: Sender<RipEvent>) -> Self {
        self.events = Some(Mutex::new(sender));
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn publish(&self, event: RipEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine.
            let _ = events.lock().send(event);
        }
    }

    fn collect(&self, path: &Path, summary: &mut Summary) -> Option<Arc<dyn MediaSource>> {

        let media: Arc<dyn MediaSource> = match open_media(path, self.options.keep_temp_files) {
            Ok(media) => Arc::from(media),
            Err(error) => {
                warn!("{}: {}", path.display(), error);
                summary.discarded += 1;
                self.publish(RipEvent::MediaDiscarded { path: path.to_path_buf(), error });
                return None
            }
        };
        let too_old = match (self.options.age, file_age(path)) {
            (Some(age), Ok(media_age)) => media_age > age,
            _ => false,
        };
        let filter = if too_old {
            Some(MediaFilter::TooOld)
        } else if !media.tracks().iter().any(|track| {
            track.language.map_or(false, |language| self.options.accepts_language(language))
        }) {
            Some(MediaFilter::NoAcceptedLanguage)
        } else {
            None
        };

        if let Some(filter) = filter {
            debug!("{}: filtered out ({:?})", path.display(), filter);
            summary.filtered += 1;
            self.publish(RipEvent::MediaFiltered { path: path.to_path_buf(), filter });
            return None
        }

        summary.collected += 1;
        self.publish(
            RipEvent::MediaCollected { path: path.to_path_buf(), tracks: media.tracks().len() }
        );

        Some(media)
    }

    /// Rips every selected track of the given media files.
    pub fn rip(&self, paths: &[PathBuf]) -> Summary {

        let mut summary = Summary::default();
        let mut jobs = VecDeque::new();
        let mut claimed = HashSet::new();

        for path in paths {

            let media = match self.collect(path, &mut summary) {
                Some(media) => media,
                None => continue,
            };
            let selection = select_tracks(&media.base_path(), media.tracks(), &self.options);

            for (track, rejection) in selection.rejected {
                debug!("{}: track {} rejected ({:?})", path.display(), track, rejection);
                self.publish(RipEvent::TrackRejected { path: path.clone(), track, rejection });
            }

            for selection in selection.selected {

                if !claimed.insert(selection.target.clone()) {
                    let track = selection.track.id;
                    let rejection = Rejection::TargetClaimed;
                    debug!("{}: track {} rejected ({:?})", path.display(), track, rejection);
                    self.publish(RipEvent::TrackRejected { path: path.clone(), track, rejection });
                    continue
                }

                jobs.push_back(Job { media: Arc::clone(&media), selection });
            }
        }

        summary.attempted = jobs.len();

        let workers = self.options.max_workers.clamp(1, jobs.len().max(1));
        let queue = Mutex::new(jobs);
        let summary = Mutex::new(summary);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {

                    let job = queue.lock().pop_front();
                    let job = match job {
                        Some(job) => job,
                        None => break,
                    };

                    self.run(job, &summary);
                });
            }
        });

        summary.into_inner()
    }

    fn run(&self, job: Job, summary: &Mutex<Summary>) {

        let path = job.media.path().to_path_buf();
        let track = job.selection.track.id;
        let target = job.selection.target.clone();

        self.publish(
            RipEvent::TrackStarted { path: path.clone(), track, target: target.clone() }
        );

        let result = rip_track(
            job.media.as_ref(),
            &job.selection,
            &self.options,
            self.recognizer.as_ref(),
        );

        match &result {
            Ok(decision) => info!("{}: {:?}", target.display(), decision),
            Err(error) => warn!("{}: {}", target.display(), error_chain(error)),
        }

        summary.lock().record(&result);
        self.publish(RipEvent::TrackFinished { path, track, target, result });
    }
}

/// Renders an error with all of its sources.
pub fn error_chain(error: &dyn std::error::Error) -> String {

    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}
