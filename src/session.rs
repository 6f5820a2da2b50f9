//! Per-session application state.
//!
//! A [`Session`] owns the pool, the id index, the address bar, and the one
//! [`CurrentSelection`]. Every state change goes through its methods so the
//! location always shows the canonical permalink of what is on screen.
//!
//! ## Startup resolution
//!
//! ```text
//! path is /a/{area}/{id} ──► indexed with same area? ──yes──► Permalink
//!          │                          │
//!          no                         no ──► NotFound (placeholder, then recover)
//!          ▼
//! ?area= names an area? ──► use it ──► random pick ──► Random
//! ```

use crate::area::Area;
use crate::content::{LOAD_FAILED_TEXT, Pool};
use crate::ident::derive_id;
use crate::permalink::{IdIndex, Location, parse_permalink, permalink_url, write_canonical_path};
use crate::selection::pick_from;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shown while a permalink that could not be resolved is on screen.
pub const NOT_FOUND_TEXT: &str = "That affirmation could not be found. Finding you another one…";

/// The affirmation on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSelection {
    pub area: Area,
    pub text: String,
    pub id: String,
}

impl CurrentSelection {
    pub fn new(area: Area, text: impl Into<String>) -> Self {
        let text = text.into();
        let id = derive_id(area.key(), &text);
        Self { area, text, id }
    }
}

/// How [`Session::start`] arrived at the first affirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The location named an indexed affirmation.
    Permalink,
    /// Picked at random, possibly within a `?area=` filter.
    Random,
    /// The location named a permalink that does not resolve. Nothing is
    /// selected until [`Session::recover`] runs.
    NotFound,
}

pub struct Session {
    pool: Pool,
    index: IdIndex,
    area: Area,
    current: Option<CurrentSelection>,
    last_index: Option<usize>,
    location: Location,
    origin: String,
}

impl Session {
    pub fn new(pool: Pool, location: Location, origin: impl Into<String>) -> Self {
        let index = IdIndex::build(&pool);
        tracing::debug!(
            ids = index.len(),
            collisions = index.collisions().len(),
            "id index built"
        );
        Self {
            pool,
            index,
            area: Area::General,
            current: None,
            last_index: None,
            location,
            origin: origin.into(),
        }
    }

    /// Resolve the first affirmation from the location.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Resolution {
        if let Some(permalink) = parse_permalink(self.location.path()) {
            if let Some(area) = Area::from_key(&permalink.area) {
                self.area = area;
            }
            let resolved = self
                .index
                .resolve(&permalink)
                .map(|(area, text)| CurrentSelection::new(area, text));
            return match resolved {
                Some(selection) => {
                    tracing::info!(area = %selection.area, id = %selection.id, "permalink resolved");
                    self.show(selection);
                    Resolution::Permalink
                }
                None => {
                    tracing::info!(path = self.location.path(), "permalink not found");
                    Resolution::NotFound
                }
            };
        }

        if let Some(area) = self.location.area_from_query() {
            self.area = area;
        }
        self.next_affirmation(rng);
        Resolution::Random
    }

    /// Replace the not-found placeholder with a fresh random pick.
    pub fn recover<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &CurrentSelection {
        self.next_affirmation(rng)
    }

    /// Pick a different affirmation from the current area's sub-pool.
    pub fn next_affirmation<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &CurrentSelection {
        let area = self.area;
        let picked = pick_from(self.pool.for_area(area), self.last_index, rng)
            .map(|(text, index)| (text.clone(), index));
        let selection = match picked {
            Some((text, index)) => {
                self.last_index = Some(index);
                CurrentSelection::new(area, text)
            }
            // Only reachable with an empty pool, which loading never produces.
            None => CurrentSelection::new(area, LOAD_FAILED_TEXT),
        };
        self.show(selection)
    }

    /// Switch areas without changing the quote on screen. The permalink is
    /// rewritten for the current text under the new area.
    pub fn set_area(&mut self, area: Area) {
        self.area = area;
        self.last_index = None;
        if let Some(current) = self.current.take() {
            self.show(CurrentSelection::new(area, current.text));
        }
    }

    fn show(&mut self, selection: CurrentSelection) -> &CurrentSelection {
        if write_canonical_path(&mut self.location, selection.area, &selection.id) {
            tracing::debug!(location = %self.location, "location replaced");
        }
        self.current.insert(selection)
    }

    pub fn current(&self) -> Option<&CurrentSelection> {
        self.current.as_ref()
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn index(&self) -> &IdIndex {
        &self.index
    }

    /// Absolute permalink of the current selection.
    pub fn permalink(&self) -> Option<String> {
        self.current
            .as_ref()
            .map(|c| permalink_url(&self.origin, c.area, &c.id))
    }
}

// =============================================================================
// Affirm button label
// =============================================================================

const LABELS: [(u64, &str); 10] = [
    (500, "Pull The Plug"),
    (450, "Call Legal"),
    (400, "Call HR"),
    (350, "Call IT"),
    (300, "Spin Up Backups"),
    (250, "Elevate Privileges"),
    (200, "Patch Everything"),
    (150, "Send a Manager"),
    (100, "Send Budget"),
    (50, "Help Me"),
];

/// Label of the "new affirmation" button after `clicks` presses.
pub fn button_label(clicks: u64) -> &'static str {
    LABELS
        .iter()
        .find(|(threshold, _)| clicks >= *threshold)
        .map_or("Affirm Me", |&(_, label)| label)
}

/// Button press count, persisted as a small JSON file between sessions.
#[derive(Debug, Clone)]
pub struct ClickCounter {
    path: PathBuf,
    count: u64,
}

#[derive(Serialize, Deserialize)]
struct ClickState {
    clicks: u64,
}

impl ClickCounter {
    /// Load the count from `path`. A missing or unreadable file starts at 0.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let count = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str::<ClickState>(&s).ok())
            .map_or(0, |state| state.clicks);
        Self { path, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn label(&self) -> &'static str {
        button_label(self.count)
    }

    /// Count one press and persist it. A failed write is logged, not fatal.
    pub fn increment(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        if let Err(e) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %e, "could not save click count");
        }
        self.count
    }

    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&ClickState { clicks: self.count })?;
        std::fs::write(&self.path, json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
