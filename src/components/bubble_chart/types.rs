use serde::Deserialize;

use crate::error::{ChartError, Result};

/// A relay details document as published by the consensus data source.
#[derive(Clone, Debug, Deserialize)]
pub struct RelayDocument {
	pub relays_published: String,
	pub relays: Vec<Relay>,
}

/// One relay record. Metric fields are optional on the wire because the data
/// source omits them for relays that are not running.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Relay {
	pub fingerprint: String,
	#[serde(default)]
	pub nickname: String,
	pub running: bool,
	#[serde(default)]
	pub consensus_weight: Option<f64>,
	#[serde(default)]
	pub exit_probability: Option<f64>,
	#[serde(default)]
	pub advertised_bandwidth: Option<f64>,
	#[serde(default)]
	pub country: Option<String>,
	#[serde(default)]
	pub country_name: Option<String>,
	#[serde(default, rename = "as")]
	pub as_number: Option<String>,
	#[serde(default)]
	pub as_name: Option<String>,
	#[serde(default)]
	pub contact: Option<String>,
	#[serde(default)]
	pub platform: Option<String>,
	#[serde(default)]
	pub effective_family: Vec<String>,
}

/// The metrics of a running relay after validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelayMetrics {
	pub consensus_weight: f64,
	pub exit_probability: f64,
	pub advertised_bandwidth: f64,
}

impl Relay {
	/// Metrics needed for layout and icon selection, or the first field that is
	/// missing or out of range.
	pub fn metrics(&self) -> Result<RelayMetrics> {
		Ok(RelayMetrics {
			consensus_weight: self.metric("consensus_weight", self.consensus_weight)?,
			exit_probability: self.metric("exit_probability", self.exit_probability)?,
			advertised_bandwidth: self.metric("advertised_bandwidth", self.advertised_bandwidth)?,
		})
	}

	fn metric(&self, field: &'static str, value: Option<f64>) -> Result<f64> {
		let value = value.ok_or_else(|| ChartError::MissingField {
			fingerprint: self.fingerprint.clone(),
			field,
		})?;
		if !value.is_finite() || value < 0.0 {
			return Err(ChartError::InvalidField {
				fingerprint: self.fingerprint.clone(),
				field,
				value,
			});
		}
		Ok(value)
	}
}

impl RelayDocument {
	/// Decode a document and check every running relay carries usable metrics.
	pub fn from_json(body: &str) -> Result<Self> {
		let document: RelayDocument = serde_json::from_str(body)?;
		document.validate()?;
		Ok(document)
	}

	/// Non-running relays are never drawn, so only running ones are checked.
	pub fn validate(&self) -> Result<()> {
		for relay in self.relays.iter().filter(|r| r.running) {
			relay.metrics()?;
		}
		Ok(())
	}
}
