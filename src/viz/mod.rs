//! Drawing toolkit shared by the chart types.
//!
//! - An owned SVG scene graph ([`scene::Surface`]) that serializes to SVG text
//! - Scales (linear, log, band, time, sequential color), shape and curve generators
//! - Tweens driven by an explicit clock, zoom transforms and a force layout
//! - Axes, legends, locale-aware number formatting
//! - The chart lifecycle base ([`base::ChartBase`]) and the [`base::Chart`] contract
//! - Rasterization of a surface to PNG/JPEG through plotters

pub mod anim;
pub mod axis;
pub mod base;
pub mod force;
pub mod legend;
pub mod options;
pub mod raster;
pub mod scale;
pub mod scene;
pub mod shape;
pub mod text;
pub mod types;
pub mod util;
pub mod zoom;

pub use base::{Chart, ChartBase, ChartEnv, ChartHandle, ChartState, Tooltip};
pub use options::{BaseOptions, ChartOptions, Margin};
pub use types::{DataFormat, ImageFormat, Key, LegendPosition};
