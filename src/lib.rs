//! trace_charts
//!
//! Chart components for system-trace dashboards: device I/O, events, network
//! flows and processes. Charts render into an SVG scene hosted by a
//! [`Document`], animate through explicit clock ticks and export to
//! SVG, PNG, JPEG, JSON, CSV or TSV. Pairs with the `trace-charts` CLI.
//!
//! ### Features
//! - Pie, bar, line, heatmap, event timeline and force-directed flow charts
//! - Lenient input normalization with rejected-row accounting
//! - Theme registry with built-in `default`, `dark`, `security-focus` and `minimal` themes
//! - Responsive breakpoints, resize observation and lazy loading
//! - Keyboard navigation and ARIA labelling
//!
//! ### Example
//! ```no_run
//! use serde_json::json;
//! use trace_charts::{ChartEnv, ChartRegistry, DataFormat};
//!
//! let env = ChartEnv::default();
//! env.document.add_container("io", 800.0, 400.0);
//! let registry = ChartRegistry::with_builtin(env);
//! let chart = registry.create_with_data(
//!     "bar",
//!     "io",
//!     &json!({"title": "Reads per device"}),
//!     &json!({"sda": 120, "sdb": 45, "nvme0n1": 310}),
//! )?;
//! let svg = chart.borrow().svg().unwrap_or_default();
//! let csv = chart.borrow().export_data(DataFormat::Csv)?;
//! trace_charts::storage::write_text(&svg, "io.svg")?;
//! println!("{csv}");
//! # Ok::<(), trace_charts::ChartError>(())
//! ```

pub mod charts;
pub mod color;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod responsive;
pub mod settings;
pub mod storage;
pub mod theme;
pub mod viz;

pub use dom::{Document, DocumentEvent, Subscription};
pub use error::{ChartError, Result};
pub use registry::{ChartRegistry, register_builtin_charts};
pub use responsive::ResponsiveEngine;
pub use settings::Settings;
pub use theme::{Theme, ThemeRegistry};
pub use viz::{Chart, ChartEnv, ChartHandle, ChartState, DataFormat, ImageFormat, Key, Tooltip};
