//! Error type shared by every chart, registry and host helper.

use thiserror::Error;

/// Errors surfaced by the chart framework.
///
/// Data and rendering errors are usually recovered by the chart itself (it shows
/// the empty or error panel); configuration and programmer errors reach the caller.
#[derive(Debug, Error)]
pub enum ChartError {
    /// The container id does not resolve to a connected element.
    #[error("container not found: #{0}")]
    ContainerNotFound(String),

    /// An option carries a value the chart cannot use.
    #[error("invalid option `{option}`: {reason}")]
    InvalidOptions { option: String, reason: String },

    /// Nothing usable remained after normalization.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Drawing failed part-way through.
    #[error("render failure: {0}")]
    RenderFailure(String),

    /// The registry has no constructor under this name.
    #[error("unknown chart type: {0}")]
    UnknownChartType(String),

    /// A method was called on a chart after `destroy()`.
    #[error("chart #{0} has been destroyed")]
    DestroyedChart(String),

    /// Image or data export failed.
    #[error("export failed: {0}")]
    Export(String),

    /// A lazy-load fetch failed.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ChartError {
    pub(crate) fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;
