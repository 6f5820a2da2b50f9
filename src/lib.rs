//! # affirm-card
//!
//! Short, tongue-in-cheek affirmations for marketers, one per card. Each
//! affirmation is filed under a topical area, gets a stable short id, and is
//! reachable at a canonical permalink. The current card can be copied as a
//! caption, downloaded as a PNG, or shared; each of those reports an
//! engagement event to a small counter API backed by SQLite.
//!
//! # Architecture
//!
//! ```text
//! content JSON ──► Pool ──► IdIndex ──► Session ◄── Location (/a/{area}/{id})
//!                                         │
//!                        ┌────────────────┼────────────────┐
//!                        ▼                ▼                ▼
//!                    card render      export/share      reporter ──► POST /api/track
//!                   (Surface trait)  (Platform trait)                      │
//!                                                                      CounterStore
//!                                                                     GET /api/top
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`area`] | The closed set of areas and their keys and labels |
//! | [`ident`] | `derive_id`: stable 8-character base-36 id for `(area, text)` |
//! | [`content`] | Content document loading, normalization, and the per-area pool |
//! | [`permalink`] | `/a/{area}/{id}` parsing and writing, id index, address bar |
//! | [`selection`] | Uniform random pick with no immediate repeat |
//! | [`session`] | Per-session state: current card, area, location, click count |
//! | [`card`] | Card layout, auto-fit text, and the tiny-skia raster surface |
//! | [`export`] | Copy, download, and the share strategy chain |
//! | [`report`] | Fire-and-forget engagement reporting |
//! | [`store`] | SQLite counter table |
//! | [`server`] | axum counter API: `/api/track` and `/api/top` |
//! | [`app`] | Interactive terminal session |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Ids Are Derived, Not Stored
//!
//! A permalink id is a hash of the area key and the trimmed text, so the same
//! affirmation gets the same link on every load and on every machine. Editing
//! the text or moving it to another area changes its id. Ids from the content
//! document are kept on the record but never used for links.
//!
//! ## Drawing Through a Trait
//!
//! [`card::render_card`] only talks to [`card::Surface`]. The raster surface
//! paints pixels; the recording surface used in tests captures draw calls so
//! layout can be asserted without fonts or images.
//!
//! ## Reporting Never Blocks
//!
//! [`report::EngagementSink::report`] returns immediately. Delivery happens
//! on a detached task, and failures are logged at debug level and dropped.

pub mod app;
pub mod area;
pub mod card;
pub mod config;
pub mod content;
pub mod export;
pub mod ident;
pub mod output;
pub mod permalink;
pub mod report;
pub mod selection;
pub mod server;
pub mod session;
pub mod store;
