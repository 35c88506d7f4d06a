/// Driver for the external infrastructure engine
pub mod pulumi;

pub use pulumi::{Operation, PulumiEngine};
