/// GCP resource records for the GPU training cluster
pub mod container;
pub mod naming;

pub use container::{ClusterSpec, NodePoolSpec, RandomSuffixSpec};
