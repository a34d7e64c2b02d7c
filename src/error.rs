//! Errors surfaced by the load → group → layout → render pipeline.

use thiserror::Error;

/// Everything that can stop the chart from being drawn.
#[derive(Debug, Error)]
pub enum ChartError {
	/// The request could not be issued or its body could not be read.
	#[error("failed to fetch {url}: {message}")]
	Fetch { url: String, message: String },

	/// The server answered with a non-success status.
	#[error("failed to fetch {url}: HTTP {status} {status_text}")]
	Status {
		url: String,
		status: u16,
		status_text: String,
	},

	/// The body is not a relay document.
	#[error("malformed relay document: {0}")]
	Decode(#[from] serde_json::Error),

	/// A running relay lacks a field the chart needs.
	#[error("relay {fingerprint} has no `{field}`")]
	MissingField {
		fingerprint: String,
		field: &'static str,
	},

	/// A running relay carries a negative or non-finite metric.
	#[error("relay {fingerprint} has invalid `{field}`: {value}")]
	InvalidField {
		fingerprint: String,
		field: &'static str,
		value: f64,
	},

	/// The drawing surface is unavailable.
	#[error("canvas unavailable: {0}")]
	Canvas(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChartError>;
