mod counts;
mod node;
mod status;

pub use counts::NodeCounts;
pub use node::{NodeState, NodeStatus};
pub use status::{
    classify, StatusThresholds, DEFAULT_NOT_READY_TIMEOUT_MS, DEFAULT_SUSPECT_TIMEOUT_MS,
};
