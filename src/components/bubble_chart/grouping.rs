use std::collections::HashMap;

use log::debug;

use super::types::{Relay, RelayMetrics};
use crate::error::Result;

/// How relays are partitioned into bubbles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Grouping {
	#[default]
	Country,
	AutonomousSystem,
	Family,
	Contact,
	Platform,
	/// Caller-defined key and display name.
	Custom {
		key: fn(&Relay) -> String,
		name: fn(&Relay) -> String,
	},
}

impl Grouping {
	/// Parse a grouping name as used in page query strings.
	pub fn parse(s: &str) -> Option<Self> {
		match s.trim().to_lowercase().as_str() {
			"country" => Some(Self::Country),
			"as" | "asn" => Some(Self::AutonomousSystem),
			"family" => Some(Self::Family),
			"contact" => Some(Self::Contact),
			"platform" | "version" => Some(Self::Platform),
			_ => None,
		}
	}

	pub fn key(&self, relay: &Relay) -> String {
		match self {
			Self::Country => relay
				.country
				.as_deref()
				.map(str::to_lowercase)
				.unwrap_or_default(),
			Self::AutonomousSystem => relay.as_number.clone().unwrap_or_default(),
			Self::Family => family_key(relay),
			Self::Contact => contact(relay),
			Self::Platform => platform(relay),
			Self::Custom { key, .. } => key(relay),
		}
	}

	/// Display name for the group `relay` falls into. `Family` names need the
	/// whole relay set and are resolved in [`group_relays`].
	pub fn name(&self, relay: &Relay) -> String {
		match self {
			Self::Country => relay
				.country_name
				.clone()
				.or_else(|| relay.country.as_deref().map(str::to_uppercase))
				.unwrap_or_else(|| "Unknown".to_string()),
			Self::AutonomousSystem => relay
				.as_name
				.clone()
				.or_else(|| relay.as_number.clone())
				.unwrap_or_else(|| "Unknown".to_string()),
			Self::Family => family_key(relay),
			Self::Contact => contact(relay),
			Self::Platform => platform(relay),
			Self::Custom { name, .. } => name(relay),
		}
	}
}

fn strip_fingerprint(fp: &str) -> &str {
	fp.strip_prefix('$').unwrap_or(fp)
}

fn family_key(relay: &Relay) -> String {
	relay
		.effective_family
		.iter()
		.map(|fp| strip_fingerprint(fp))
		.chain(std::iter::once(strip_fingerprint(&relay.fingerprint)))
		.min()
		.unwrap_or_default()
		.to_string()
}

fn contact(relay: &Relay) -> String {
	relay
		.contact
		.as_deref()
		.map(str::trim)
		.filter(|c| !c.is_empty())
		.unwrap_or("(no contact)")
		.to_string()
}

fn platform(relay: &Relay) -> String {
	let Some(platform) = relay.platform.as_deref() else {
		return "(unknown)".to_string();
	};
	let mut words = platform.split_whitespace();
	match (words.next(), words.next()) {
		(Some(product), Some(version)) => format!("{product} {version}"),
		(Some(product), None) => product.to_string(),
		_ => "(unknown)".to_string(),
	}
}

/// A relay placed in a group.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
	pub fingerprint: String,
	pub name: String,
	pub value: f64,
	pub exit: bool,
	pub bandwidth: f64,
}

impl Leaf {
	fn from_metrics(relay: &Relay, metrics: RelayMetrics) -> Self {
		Self {
			fingerprint: relay.fingerprint.clone(),
			name: leaf_label(relay),
			value: metrics.consensus_weight,
			exit: metrics.exit_probability > 0.0,
			bandwidth: metrics.advertised_bandwidth,
		}
	}
}

/// Leaf label as the published charts compute it: a relay with a nickname is
/// labelled by fingerprint, one without keeps its empty nickname.
pub fn leaf_label(relay: &Relay) -> String {
	if relay.nickname.is_empty() {
		relay.nickname.clone()
	} else {
		relay.fingerprint.clone()
	}
}

/// A named, non-empty set of relays.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
	pub key: String,
	pub name: String,
	pub children: Vec<Leaf>,
}

/// Partition running relays by `grouping`. Groups appear in order of their first
/// member; members keep document order.
///
/// Every running relay must carry valid metrics, whether or not the exits-only
/// filter drops it.
pub fn group_relays(
	relays: &[Relay],
	grouping: &Grouping,
	exits_only: bool,
) -> Result<Vec<Group>> {
	let mut groups: Vec<Group> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();
	let (mut stopped, mut non_exit) = (0usize, 0usize);

	for relay in relays {
		if !relay.running {
			stopped += 1;
			continue;
		}
		let metrics = relay.metrics()?;
		if exits_only && metrics.exit_probability == 0.0 {
			non_exit += 1;
			continue;
		}
		let key = grouping.key(relay);
		let slot = *index.entry(key.clone()).or_insert_with(|| {
			groups.push(Group {
				key,
				name: grouping.name(relay),
				children: Vec::new(),
			});
			groups.len() - 1
		});
		groups[slot].children.push(Leaf::from_metrics(relay, metrics));
	}

	if matches!(grouping, Grouping::Family) {
		let nicknames: HashMap<&str, &str> = relays
			.iter()
			.filter(|r| !r.nickname.is_empty())
			.map(|r| (strip_fingerprint(&r.fingerprint), r.nickname.as_str()))
			.collect();
		for group in &mut groups {
			if let Some(nickname) = nicknames.get(group.key.as_str()) {
				group.name = (*nickname).to_string();
			}
		}
	}

	debug!(
		"grouped {} relays into {} groups ({} not running, {} non-exit skipped)",
		relays.len() - stopped - non_exit,
		groups.len(),
		stopped,
		non_exit
	);
	Ok(groups)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ChartError;

	fn relay(fp: &str, running: bool, exit: f64, country: &str) -> Relay {
		Relay {
			fingerprint: fp.into(),
			nickname: format!("nick{fp}"),
			running,
			consensus_weight: Some(10.0),
			exit_probability: Some(exit),
			advertised_bandwidth: Some(1_000.0),
			country: Some(country.into()),
			..Default::default()
		}
	}

	#[test]
	fn stopped_relays_are_dropped() {
		let relays = vec![relay("A", true, 0.0, "us"), relay("B", false, 0.0, "us")];
		let groups = group_relays(&relays, &Grouping::Country, false).unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].children.len(), 1);
		assert_eq!(groups[0].children[0].fingerprint, "A");
	}

	#[test]
	fn exits_only_drops_zero_probability() {
		let relays = vec![relay("A", true, 0.0, "us"), relay("B", true, 0.2, "de")];
		let groups = group_relays(&relays, &Grouping::Country, true).unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].key, "de");
		assert!(groups[0].children[0].exit);
	}

	#[test]
	fn exit_flag_comes_from_exit_probability() {
		let mut r = relay("A", true, 0.5, "us");
		r.advertised_bandwidth = Some(0.0);
		let groups = group_relays(&[r], &Grouping::Country, true).unwrap();
		let leaf = &groups[0].children[0];
		assert!(leaf.exit);
		assert_eq!(leaf.value, 10.0);
		assert_eq!(leaf.bandwidth, 0.0);
	}

	#[test]
	fn incomplete_running_relay_is_an_error() {
		let mut r = relay("A", true, 0.5, "us");
		r.advertised_bandwidth = None;
		let err = group_relays(&[r], &Grouping::Country, true).unwrap_err();
		assert!(matches!(
			err,
			ChartError::MissingField { field: "advertised_bandwidth", .. }
		));

		// Dropped by the exits-only filter, but still checked.
		let mut r = relay("B", true, 0.0, "us");
		r.consensus_weight = None;
		assert!(group_relays(&[r], &Grouping::Country, true).is_err());

		let mut r = relay("C", false, 0.5, "us");
		r.exit_probability = None;
		assert!(group_relays(&[r], &Grouping::Country, true).unwrap().is_empty());
	}

	#[test]
	fn groups_follow_first_appearance() {
		let relays = vec![
			relay("A", true, 0.0, "us"),
			relay("B", true, 0.0, "de"),
			relay("C", true, 0.0, "us"),
		];
		let groups = group_relays(&relays, &Grouping::Country, false).unwrap();
		let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
		assert_eq!(keys, ["us", "de"]);
		let members: Vec<_> = groups[0]
			.children
			.iter()
			.map(|l| l.fingerprint.as_str())
			.collect();
		assert_eq!(members, ["A", "C"]);
	}

	#[test]
	fn country_name_falls_back_to_code() {
		let mut r = relay("A", true, 0.0, "us");
		assert_eq!(Grouping::Country.name(&r), "US");
		r.country_name = Some("United States of America".into());
		assert_eq!(Grouping::Country.name(&r), "United States of America");
		r.country = None;
		r.country_name = None;
		assert_eq!(Grouping::Country.name(&r), "Unknown");
	}

	#[test]
	fn family_members_share_a_group() {
		let mut a = relay("BBB", true, 0.0, "us");
		a.effective_family = vec!["$BBB".into(), "$AAA".into()];
		let mut b = relay("AAA", true, 0.0, "de");
		b.effective_family = vec!["$AAA".into(), "$BBB".into()];
		let c = relay("CCC", true, 0.0, "de");
		let groups = group_relays(&[a, b, c], &Grouping::Family, false).unwrap();
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].key, "AAA");
		assert_eq!(groups[0].name, "nickAAA");
		assert_eq!(groups[0].children.len(), 2);
		assert_eq!(groups[1].name, "nickCCC");
	}

	#[test]
	fn platform_keeps_product_and_version() {
		let mut r = relay("A", true, 0.0, "us");
		r.platform = Some("Tor 0.4.8.9 on Linux".into());
		assert_eq!(Grouping::Platform.key(&r), "Tor 0.4.8.9");
		r.platform = None;
		assert_eq!(Grouping::Platform.key(&r), "(unknown)");
	}

	#[test]
	fn blank_contact_is_grouped_together() {
		let mut r = relay("A", true, 0.0, "us");
		r.contact = Some("   ".into());
		assert_eq!(Grouping::Contact.name(&r), "(no contact)");
	}

	#[test]
	fn custom_grouping_uses_caller_functions() {
		let grouping = Grouping::Custom {
			key: |r| r.fingerprint[..1].to_string(),
			name: |r| format!("starts with {}", &r.fingerprint[..1]),
		};
		let groups = group_relays(
			&[relay("A1", true, 0.0, "us"), relay("A2", true, 0.0, "de")],
			&grouping,
			false,
		)
		.unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].name, "starts with A");
	}

	#[test]
	fn leaf_label_keeps_observed_rule() {
		let mut r = relay("ABC", true, 0.0, "us");
		assert_eq!(leaf_label(&r), "ABC");
		r.nickname.clear();
		assert_eq!(leaf_label(&r), "");
	}

	#[test]
	fn parse_accepts_known_names() {
		assert_eq!(Grouping::parse("AS"), Some(Grouping::AutonomousSystem));
		assert_eq!(Grouping::parse(" family "), Some(Grouping::Family));
		assert_eq!(Grouping::parse("planet"), None);
	}
}
