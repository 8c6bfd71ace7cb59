/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Pairs compositions with the compositions that clear them.
//!
//! # Overview
//!
//! Display sets describe changes to the screen, not intervals. The [`TimelineBuilder`] walks
//! them in stream order and keeps track of what is currently shown:
//!
//! - A display set without composition objects clears the screen and closes the open event.
//! - A display set that shows the same objects as the open event, and is not an epoch start,
//!   only updates it (a palette swap or a refresh). The event keeps its start time. Objects
//!   are the same when their id, version and data all match.
//! - Anything else closes the open event at its own PTS and opens a new one.
//!
//! Events that would last zero ticks and display sets that go back in time are dropped and
//! reported as [`Anomaly`] values.


use super::{
    bitmap::{self, Bitmap, DecodeError},
    displayset::{DisplaySet, Palette},
    segment::CompositionState,
    ts_to_millis,
    ts_to_timestamp,
    TICKS_PER_MILLISECOND,
};
use log::{debug, warn};

/// How long an event that is never cleared stays on screen.
pub const UNTERMINATED_DURATION_MS: u32 = 3_000;

/// The largest raster [`SubtitleEvent::render`] will allocate.
pub const MAX_RASTER_BYTES: usize = 1 << 28;

/// A decoded object at its position on the video plane.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Placement {
    pub x: u16,
    pub y: u16,
    pub bitmap: Bitmap,
}

/// A rectangle on the video plane.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Straight RGBA pixels covering a [`Rect`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Raster {
    pub rect: Rect,
    /// Row-major RGBA quadruplets.
    pub data: Vec<u8>,
}

impl Raster {

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.rect.width as usize + x as usize) * 4;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2], self.data[offset + 3]]
    }
}

/// One caption with the interval `[start, end)` it is visible for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubtitleEvent {
    /// The position of this event within its timeline.
    pub index: usize,
    /// The PTS at which the event appears.
    pub start: u32,
    /// The PTS at which the event is cleared or replaced.
    pub end: u32,
    pub placements: Vec<Placement>,
    pub palette: Palette,
    /// Set when any of the shown objects is flagged as forced.
    pub forced: bool,
}

impl SubtitleEvent {

    pub fn start_ms(&self) -> u64 {
        ts_to_millis(self.start)
    }

    pub fn end_ms(&self) -> u64 {
        ts_to_millis(self.end)
    }

    /// The smallest rectangle covering every placement.
    pub fn bounds(&self) -> Rect {

        let mut placements = self.placements.iter();
        let first = match placements.next() {
            Some(first) => first,
            None => return Rect::default(),
        };
        let mut left = first.x as u32;
        let mut top = first.y as u32;
        let mut right = left + first.bitmap.width() as u32;
        let mut bottom = top + first.bitmap.height() as u32;

        for placement in placements {
            left = left.min(placement.x as u32);
            top = top.min(placement.y as u32);
            right = right.max(placement.x as u32 + placement.bitmap.width() as u32);
            bottom = bottom.max(placement.y as u32 + placement.bitmap.height() as u32);
        }

        Rect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Applies the palette and draws every placement into one image cropped to
    /// [`bounds`](SubtitleEvent::bounds). Later placements cover earlier ones.
    ///
    /// Bounds needing more than [`MAX_RASTER_BYTES`] yield an empty raster.
    pub fn render(&self) -> Raster {

        let rect = self.bounds();
        let colors = (0..=255_u8).map(|index| self.palette.rgba(index)).collect::<Vec<[u8; 4]>>();
        let size = (rect.width as usize)
            .checked_mul(rect.height as usize)
            .and_then(|area| area.checked_mul(4))
            .filter(|&size| size <= MAX_RASTER_BYTES);
        let mut data = match size {
            Some(size) => vec![0_u8; size],
            None => {
                warn!("event at {} is too large to render", ts_to_timestamp(self.start));
                return Raster::default()
            }
        };

        for placement in self.placements.iter() {

            let left = (placement.x as u32 - rect.x) as usize;
            let top = (placement.y as u32 - rect.y) as usize;

            for row in 0..placement.bitmap.height() {
                for (column, &index) in placement.bitmap.row(row).iter().enumerate() {

                    let color = colors[index as usize];

                    if color[3] == 0 {
                        continue
                    }

                    let x = left + column;
                    let y = top + row as usize;
                    let offset = (y * rect.width as usize + x) * 4;

                    data[offset..offset + 4].copy_from_slice(&color);
                }
            }
        }

        Raster { rect, data }
    }
}

/// Why a display set did not become an event.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DropReason {
    /// The next composition arrived at the same PTS.
    ZeroDuration,
    /// The display set has a PTS lower than one already seen.
    OutOfOrder,
}

/// A recoverable irregularity found while building a timeline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Anomaly {
    Dropped {
        pts: u32,
        reason: DropReason,
    },
    /// The stream ended while this event was still shown; its end was made up.
    Unterminated {
        start: u32,
    },
}

/// The ordered events of one stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    pub events: Vec<SubtitleEvent>,
    pub anomalies: Vec<Anomaly>,
    /// The number of display sets dropped because something they refer to was never defined.
    pub incomplete: usize,
}

#[derive(Debug)]
struct OpenEvent {
    start: u32,
    identity: Vec<(u16, u8, Vec<u8>)>,
    placements: Vec<Placement>,
    palette: Palette,
    forced: bool,
}

/// Builds a [`Timeline`] one display set at a time.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    open: Option<OpenEvent>,
    last_pts: Option<u32>,
    events: Vec<SubtitleEvent>,
    anomalies: Vec<Anomaly>,
}

impl TimelineBuilder {

    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one display set. Only a bitmap that fails to decode is an error.
    pub fn push(&mut self, ds: &DisplaySet) -> Result<(), DecodeError> {

        if let Some(last_pts) = self.last_pts {
            if ds.pts < last_pts {
                debug!(
                    "dropping display set at {}: earlier than {}",
                    ts_to_timestamp(ds.pts),
                    ts_to_timestamp(last_pts),
                );
                self.anomalies.push(Anomaly::Dropped {
                    pts: ds.pts,
                    reason: DropReason::OutOfOrder,
                });
                return Ok(())
            }
        }

        self.last_pts = Some(ds.pts);

        if ds.is_clear() {
            self.close(ds.pts);
            return Ok(())
        }

        let placements = placements(ds)?;
        let identity: Vec<(u16, u8, Vec<u8>)> = ds.objects
            .values()
            .map(|object| (object.id, object.version, object.data.clone()))
            .collect();
        let forced = ds.composition.objects.iter().any(|co| co.forced);

        if let Some(open) = self.open.as_mut() {
            if ds.pts > open.start
                && ds.composition.state != CompositionState::EpochStart
                && open.identity == identity {
                open.placements = placements;
                open.palette = ds.palette.clone();
                open.forced = forced;
                return Ok(())
            }
        }

        self.close(ds.pts);
        self.open = Some(
            OpenEvent {
                start: ds.pts,
                identity,
                placements,
                palette: ds.palette.clone(),
                forced,
            }
        );

        Ok(())
    }

    pub fn finish(mut self) -> Timeline {

        if let Some(open) = self.open.as_ref() {

            let start = open.start;

            warn!("event at {} is never cleared", ts_to_timestamp(start));
            self.anomalies.push(Anomaly::Unterminated { start });
            self.close(start.saturating_add(UNTERMINATED_DURATION_MS * TICKS_PER_MILLISECOND));
        }

        Timeline {
            events: self.events,
            anomalies: self.anomalies,
            incomplete: 0,
        }
    }

    fn close(&mut self, end: u32) {

        let open = match self.open.take() {
            Some(open) => open,
            None => return,
        };

        if end <= open.start {
            debug!("dropping zero-duration event at {}", ts_to_timestamp(open.start));
            self.anomalies.push(Anomaly::Dropped {
                pts: open.start,
                reason: DropReason::ZeroDuration,
            });
            return
        }

        self.events.push(
            SubtitleEvent {
                index: self.events.len(),
                start: open.start,
                end,
                placements: open.placements,
                palette: open.palette,
                forced: open.forced,
            }
        );
    }
}

fn placements(ds: &DisplaySet) -> Result<Vec<Placement>, DecodeError> {

    let mut placements = Vec::with_capacity(ds.composition.objects.len());

    for co in ds.composition.objects.iter() {

        let object = match ds.objects.get(&co.object_id) {
            Some(object) => object,
            None => continue,
        };
        let decoded = bitmap::decode(&object.data, object.width, object.height)?;
        let bitmap = match &co.crop {
            Some(crop) => decoded.crop(crop.x, crop.y, crop.width, crop.height),
            None => decoded,
        };

        placements.push(Placement { x: co.x, y: co.y, bitmap });
    }

    Ok(placements)
}
