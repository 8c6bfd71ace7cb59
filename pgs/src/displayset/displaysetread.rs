/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

use super::{
    Composition,
    DisplaySet,
    Object,
    Palette,
    PaletteEntry,
    Window,
};
use crate::{
    segment::{
        CompositionState,
        ObjectDefinitionSegment,
        PaletteDefinitionSegment,
        PresentationCompositionSegment,
        ReadError as SegmentReadError,
        ReadResult as SegmentReadResult,
        Segment,
    },
    ts_to_timestamp,
};
use std::{
    collections::BTreeMap,
    iter::FusedIterator,
};
use log::{trace, warn};
use thiserror::Error as ThisError;

pub type ReadResult<T> = Result<T, ReadError>;

#[derive(ThisError, Debug)]
pub enum ReadError {
    #[error("segment value error")]
    SegmentError {
        #[from]
        source: SegmentReadError,
    },
    #[error("object could not be reassembled")]
    TruncatedObject(#[from] TruncatedObject),
    #[error("{name} segment appears before any presentation composition segment")]
    MissingPresentationComposition {
        name: &'static str,
    },
    #[error("unexpected presentation composition segment within display set")]
    UnexpectedPresentationComposition,
    #[error("end segment PTS {found} does not match composition PTS {expected}")]
    InconsistentEndTimestamp {
        expected: u32,
        found: u32,
    },
}

/// Describes why a fragmented object could not be put back together.
#[derive(ThisError, Clone, Debug, PartialEq)]
pub enum TruncatedObject {
    #[error("object {object_id} continues without a first fragment")]
    MissingFirstFragment {
        object_id: u16,
    },
    #[error("object {object_id} declares {declared} bytes of data but {actual} arrived")]
    LengthMismatch {
        object_id: u16,
        declared: usize,
        actual: usize,
    },
}

#[derive(Debug)]
struct Fragment {
    version: u8,
    width: u16,
    height: u16,
    declared: usize,
    data: Vec<u8>,
}

/// Turns segments into display sets, one segment at a time.
///
/// The assembler is either idle, waiting for a presentation composition segment, or collecting
/// the segments of the display set that segment opened. An epoch start discards every window,
/// palette and object carried over from earlier display sets; any other composition state
/// builds on them.
///
/// A display set whose composition places an object or selects a palette that was never
/// defined is incomplete. It is dropped with a warning and counted in
/// [`skipped`](Assembler::skipped) rather than treated as an error.
#[derive(Debug, Default)]
pub struct Assembler {
    pending: Option<PresentationCompositionSegment>,
    windows: BTreeMap<u8, Window>,
    palettes: BTreeMap<u8, Palette>,
    objects: BTreeMap<u16, Object>,
    fragments: BTreeMap<u16, Fragment>,
    skipped: usize,
}

impl Assembler {

    pub fn new() -> Self {
        Self::default()
    }

    /// The number of incomplete display sets dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether no display set is currently being collected.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Feeds one segment, returning a display set once its end segment arrives.
    pub fn push(&mut self, segment: Segment) -> ReadResult<Option<DisplaySet>> {

        if self.pending.is_none() && !matches!(segment, Segment::PresentationComposition(_)) {
            return Err(ReadError::MissingPresentationComposition { name: segment.name() })
        }

        match segment {
            Segment::PresentationComposition(pcs) => {
                if self.pending.is_some() {
                    return Err(ReadError::UnexpectedPresentationComposition)
                }
                if pcs.composition_state == CompositionState::EpochStart {
                    self.windows.clear();
                    self.palettes.clear();
                    self.objects.clear();
                    self.fragments.clear();
                }
                self.pending = Some(pcs);
            }
            Segment::WindowDefinition(wds) => {
                for wd in wds.windows {
                    self.windows.insert(
                        wd.id,
                        Window {
                            x: wd.x,
                            y: wd.y,
                            width: wd.width,
                            height: wd.height,
                        },
                    );
                }
            }
            Segment::PaletteDefinition(pds) => {
                self.push_palette(pds);
            }
            Segment::ObjectDefinition(ods) => {
                self.push_fragment(ods)?;
            }
            Segment::End(es) => {

                let pcs = match self.pending.take() {
                    Some(pcs) => pcs,
                    None => return Err(ReadError::MissingPresentationComposition { name: "END" }),
                };

                if es.pts != pcs.pts {
                    return Err(ReadError::InconsistentEndTimestamp {
                        expected: pcs.pts,
                        found: es.pts,
                    })
                }

                if let Some((&object_id, fragment)) = self.fragments.iter().next() {
                    return Err(TruncatedObject::LengthMismatch {
                        object_id,
                        declared: fragment.declared,
                        actual: fragment.data.len(),
                    }.into())
                }

                return Ok(self.resolve(pcs))
            }
        }

        Ok(None)
    }

    /// Drops a display set that was still being collected when its stream ended.
    pub fn abandon(&mut self) {
        if let Some(pcs) = self.pending.take() {
            warn!(
                "stream ends inside the display set at {}; dropping it",
                ts_to_timestamp(pcs.pts),
            );
            self.fragments.clear();
            self.skipped += 1;
        }
    }

    fn push_palette(&mut self, pds: PaletteDefinitionSegment) {

        let palette = self.palettes.entry(pds.id).or_insert_with(|| Palette {
            id: pds.id,
            ..Default::default()
        });

        palette.version = pds.version;

        for pe in pds.entries {
            palette.entries.insert(
                pe.id,
                PaletteEntry {
                    y: pe.y,
                    cr: pe.cr,
                    cb: pe.cb,
                    alpha: pe.alpha,
                },
            );
        }
    }

    fn push_fragment(&mut self, ods: ObjectDefinitionSegment) -> ReadResult<()> {

        let object_id = ods.id;

        if let Some(header) = ods.header {

            if let Some(previous) = self.fragments.remove(&object_id) {
                return Err(TruncatedObject::LengthMismatch {
                    object_id,
                    declared: previous.declared,
                    actual: previous.data.len(),
                }.into())
            }

            self.fragments.insert(
                object_id,
                Fragment {
                    version: ods.version,
                    width: header.width,
                    height: header.height,
                    declared: header.data_length as usize,
                    data: ods.data,
                },
            );
        } else {
            match self.fragments.get_mut(&object_id) {
                Some(fragment) => fragment.data.extend_from_slice(&ods.data),
                None => return Err(TruncatedObject::MissingFirstFragment { object_id }.into()),
            }
        }

        let fragment = match self.fragments.get(&object_id) {
            Some(fragment) => fragment,
            None => return Err(TruncatedObject::MissingFirstFragment { object_id }.into()),
        };

        if fragment.data.len() > fragment.declared
            || (ods.sequence.is_last() && fragment.data.len() != fragment.declared) {
            return Err(TruncatedObject::LengthMismatch {
                object_id,
                declared: fragment.declared,
                actual: fragment.data.len(),
            }.into())
        }

        if ods.sequence.is_last() {
            if let Some(fragment) = self.fragments.remove(&object_id) {
                trace!(
                    "object {} v{} reassembled: {}x{}, {} bytes",
                    object_id,
                    fragment.version,
                    fragment.width,
                    fragment.height,
                    fragment.data.len(),
                );
                self.objects.insert(
                    object_id,
                    Object {
                        id: object_id,
                        version: fragment.version,
                        width: fragment.width,
                        height: fragment.height,
                        data: fragment.data,
                    },
                );
            }
        }

        Ok(())
    }

    fn resolve(&mut self, pcs: PresentationCompositionSegment) -> Option<DisplaySet> {

        let mut objects = BTreeMap::new();

        for co in pcs.composition_objects.iter() {
            match self.objects.get(&co.object_id) {
                Some(object) => {
                    objects.insert(co.object_id, object.clone());
                }
                None => {
                    warn!(
                        "skipping display set at {}: object {} is not defined",
                        ts_to_timestamp(pcs.pts),
                        co.object_id,
                    );
                    self.skipped += 1;
                    return None
                }
            }
        }

        let palette = match self.palettes.get(&pcs.palette_id) {
            Some(palette) => palette.clone(),
            None if pcs.composition_objects.is_empty() => Palette {
                id: pcs.palette_id,
                ..Default::default()
            },
            None => {
                warn!(
                    "skipping display set at {}: palette {} is not defined",
                    ts_to_timestamp(pcs.pts),
                    pcs.palette_id,
                );
                self.skipped += 1;
                return None
            }
        };

        Some(
            DisplaySet {
                pts: pcs.pts,
                dts: pcs.dts,
                width: pcs.width,
                height: pcs.height,
                composition: Composition {
                    number: pcs.composition_number,
                    state: pcs.composition_state,
                    palette_update: pcs.palette_update,
                    objects: pcs.composition_objects,
                },
                windows: self.windows.clone(),
                palette,
                objects,
            }
        )
    }
}

/// An iterator over the display sets of a segment stream.
///
/// Created by [`DisplaySetsExt::display_sets`]. It stops after the first error.
#[derive(Debug)]
pub struct DisplaySets<I> {
    segments: I,
    assembler: Assembler,
    done: bool,
}

impl<I> DisplaySets<I> {

    /// The number of incomplete display sets dropped so far.
    pub fn skipped(&self) -> usize {
        self.assembler.skipped()
    }
}

impl<I> Iterator for DisplaySets<I> where
    I: Iterator<Item = SegmentReadResult<Segment>>,
{

    type Item = ReadResult<DisplaySet>;

    fn next(&mut self) -> Option<Self::Item> {

        if self.done {
            return None
        }

        loop {

            let segment = match self.segments.next() {
                Some(Ok(segment)) => segment,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err.into()))
                }
                None => {
                    self.done = true;
                    self.assembler.abandon();
                    return None
                }
            };

            match self.assembler.push(segment) {
                Ok(Some(display_set)) => return Some(Ok(display_set)),
                Ok(None) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err))
                }
            }
        }
    }
}

impl<I> FusedIterator for DisplaySets<I> where
    I: Iterator<Item = SegmentReadResult<Segment>>,
{}

/// Allows grouping a stream of segments into display sets.
pub trait DisplaySetsExt: Sized {
    fn display_sets(self) -> DisplaySets<Self>;
}

impl<I> DisplaySetsExt for I where
    I: Iterator<Item = SegmentReadResult<Segment>>,
{

    fn display_sets(self) -> DisplaySets<Self> {
        DisplaySets {
            segments: self,
            assembler: Assembler::new(),
            done: false,
        }
    }
}
