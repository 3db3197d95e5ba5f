//! Thumbnail gallery state: tiles are inserted a batch at a time and their
//! bitmaps are filled in a few per tick, so the UI thread never stalls on a
//! whole directory.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::time::{Duration, Instant};

use log::debug;

use crate::schedule::Deferred;

pub const BATCH_SIZE: usize = 72;
pub const THUMBNAILS_PER_TICK: usize = 6;
/// Visible bottom edge, as a fraction of content height, that triggers the next batch.
pub const LOAD_MORE_THRESHOLD: f32 = 0.92;
pub const LOAD_MORE_DELAY: Duration = Duration::from_millis(80);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryPhase {
    Empty,
    Loaded,
    ThumbnailsPending,
    AllThumbnailsLoaded,
}

/// Decoded thumbnails by list index. Indices without an entry are drawn
/// with a placeholder.
#[derive(Debug)]
pub struct ThumbnailCache<T> {
    entries: HashMap<usize, T>,
}

impl<T> Default for ThumbnailCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ThumbnailCache<T> {
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(&index)
    }

    pub fn insert(&mut self, index: usize, thumb: T) {
        self.entries.insert(index, thumb);
    }
}

#[derive(Debug)]
pub struct Gallery<T> {
    total: usize,
    loaded: usize,
    selected: Option<usize>,
    pending: VecDeque<usize>,
    cache: ThumbnailCache<T>,
    load_more: Deferred,
    batch_size: usize,
    per_tick: usize,
}

impl<T> Gallery<T> {
    /// A gallery over `total` images with nothing loaded yet.
    pub fn new(total: usize, selected: Option<usize>) -> Self {
        Self::with_limits(total, selected, BATCH_SIZE, THUMBNAILS_PER_TICK)
    }

    fn with_limits(total: usize, selected: Option<usize>, batch_size: usize, per_tick: usize) -> Self {
        let selected = match selected {
            Some(idx) if idx < total => Some(idx),
            _ if total > 0 => Some(0),
            _ => None,
        };
        Self {
            total,
            loaded: 0,
            selected,
            pending: VecDeque::new(),
            cache: ThumbnailCache::default(),
            load_more: Deferred::default(),
            batch_size: batch_size.max(1),
            per_tick: per_tick.max(1),
        }
    }

    pub fn phase(&self) -> GalleryPhase {
        if self.total == 0 {
            GalleryPhase::Empty
        } else if !self.pending.is_empty() {
            GalleryPhase::ThumbnailsPending
        } else if self.loaded >= self.total {
            GalleryPhase::AllThumbnailsLoaded
        } else {
            GalleryPhase::Loaded
        }
    }

    /// Number of tiles inserted into the grid so far.
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    pub fn has_more(&self) -> bool {
        self.loaded < self.total
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn thumbnail(&self, index: usize) -> Option<&T> {
        self.cache.get(index)
    }

    /// Inserts the next batch of tiles and queues their thumbnails.
    /// Returns the new index range, or `None` once everything is loaded.
    pub fn load_next_batch(&mut self) -> Option<Range<usize>> {
        if !self.has_more() {
            return None;
        }
        let range = self.loaded..(self.loaded + self.batch_size).min(self.total);
        self.pending.extend(range.clone());
        self.loaded = range.end;
        debug!("gallery batch {range:?} of {}", self.total);
        Some(range)
    }

    /// Loads the next batch when the visible bottom is close enough to the end.
    pub fn maybe_load_more(&mut self, bottom_fraction: f32) -> Option<Range<usize>> {
        if bottom_fraction >= LOAD_MORE_THRESHOLD {
            self.load_next_batch()
        } else {
            None
        }
    }

    /// Asks for a load-more check after a short quiet period. A check that is
    /// already scheduled is kept.
    pub fn schedule_load_check(&mut self, now: Instant) {
        if self.has_more() {
            self.load_more.schedule(now, LOAD_MORE_DELAY);
        }
    }

    /// Runs the scheduled load-more check if it is due.
    pub fn poll_load_check(&mut self, now: Instant, bottom_fraction: f32) -> Option<Range<usize>> {
        if self.load_more.fire(now) {
            self.maybe_load_more(bottom_fraction)
        } else {
            None
        }
    }

    /// Builds up to the per-tick limit of queued thumbnails. Returns how many
    /// were built.
    pub fn process_tick(&mut self, mut make: impl FnMut(usize) -> T) -> usize {
        let mut done = 0;
        while done < self.per_tick {
            let Some(index) = self.pending.pop_front() else {
                break;
            };
            if index >= self.loaded {
                continue;
            }
            self.cache.insert(index, make(index));
            done += 1;
        }
        done
    }

    /// Changes the selection and returns the previously selected index.
    /// Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> Option<Option<usize>> {
        if index >= self.total {
            return None;
        }
        Some(self.selected.replace(index))
    }

    /// The tile `delta` places away from the selection, clamped to the tiles
    /// inserted so far. No wraparound.
    pub fn step_target(&self, delta: isize) -> Option<usize> {
        let last = self.loaded.checked_sub(1)?;
        let from = self.selected.unwrap_or(0).min(last);
        Some(from.saturating_add_signed(delta).min(last))
    }

    /// Time until the next scheduled work item, if any.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        if !self.pending.is_empty() {
            return Some(Duration::ZERO);
        }
        self.load_more.remaining(now)
    }

    /// Clears every pending marker.
    pub fn cancel_jobs(&mut self) {
        self.pending.clear();
        self.load_more.cancel();
    }

    pub fn status_text(&self) -> String {
        let base = format!("{} images | loaded {}/{}", self.total, self.loaded, self.total);
        match self.phase() {
            GalleryPhase::ThumbnailsPending => format!("{base} | generating thumbnails..."),
            _ => base,
        }
    }
}

/// Tile caption, shortened to 44 characters.
pub fn caption(name: &str) -> String {
    if name.chars().count() > 44 {
        let head: String = name.chars().take(41).collect();
        format!("{head}...")
    } else {
        name.to_owned()
    }
}

/// Grid columns for a given width: tile width plus spacing on both sides.
pub fn columns_for_width(width: f32, tile_width: f32, spacing: f32) -> usize {
    let block = (tile_width + spacing * 2.0).max(1.0);
    ((width.max(1.0) / block) as usize).max(1)
}
