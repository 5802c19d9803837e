mod json;
mod model;
mod types;

pub use json::{LayoutRequest, NetworkJson};
pub use model::{Network, SubscriptionId};
pub use types::{DocumentMetadata, Edge, NetworkChange, Node};
