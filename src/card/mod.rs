//! Card rendering.
//!
//! Split the same way throughout: [`params`] describes what to draw,
//! [`calculations`] holds the pure layout math, [`surface`] is the drawing
//! seam, [`raster`] is the production surface, and [`operations`] puts them
//! together into a finished card.

pub mod assets;
pub mod calculations;
pub mod operations;
pub mod params;
pub mod raster;
pub mod surface;

pub use assets::CardAssets;
pub use operations::{CardStyle, raster_surface, render_card, render_png};
pub use raster::{FontFamilies, RasterSurface};
pub use surface::{RenderError, Surface};
