//! Concrete chart types.
//!
//! Each chart embeds a [`ChartBase`](crate::viz::base::ChartBase), owns its
//! options record and its normalized data, and registers a constructor under
//! its type name through `register`.

pub mod bar;
pub mod flow;
pub mod heatmap;
pub mod line;
pub mod pie;
pub mod timeline;

pub use bar::BarChart;
pub use flow::FlowChart;
pub use heatmap::HeatmapChart;
pub use line::LineChart;
pub use pie::PieChart;
pub use timeline::TimelineChart;

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ChartError, Result};
use crate::models::{CategoricalPoint, Normalized};
use crate::storage::{self, Table};
use crate::viz::options::{ChartOptions, deep_merge};
use crate::viz::types::DataFormat;

/// Merge `patch` onto the current options. Bad enum values fall back to their defaults.
pub(crate) fn merge_options<T: ChartOptions>(current: &T, patch: &Value) -> Result<T> {
    let mut merged = serde_json::to_value(current)?;
    deep_merge(&mut merged, patch);
    serde_json::from_value(merged).map_err(|e| ChartError::invalid_option("options", e.to_string()))
}

/// JSON for `Json`, the table for `Csv`/`Tsv`.
pub(crate) fn export<T, F>(records: &T, format: DataFormat, table: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> Table,
{
    match format {
        DataFormat::Json => storage::to_json(records),
        DataFormat::Csv | DataFormat::Tsv => storage::to_delimited(&table(), format),
    }
}

/// `label,value` with quoted labels.
pub(crate) fn categorical_table(points: &[CategoricalPoint]) -> Table {
    let mut t = Table::new(["label", "value"]).quote_text();
    for p in points {
        t.push(vec![p.label.as_str().into(), p.value.into()]);
    }
    t
}

pub(crate) fn log_normalized<T>(chart: &str, data: &Normalized<T>) {
    if data.rejected > 0 || !data.anomalies.is_empty() {
        debug!(
            "{chart}: {} item(s) rejected, {} anomalie(s): {:?}",
            data.rejected,
            data.anomalies.len(),
            data.anomalies
        );
    }
}
