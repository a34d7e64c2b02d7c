mod component;
pub mod grouping;
pub mod pack;
mod render;
pub mod state;
mod types;

pub use component::BubbleChart;
pub use grouping::{Group, Grouping, Leaf, group_relays};
pub use types::{Relay, RelayDocument, RelayMetrics};
