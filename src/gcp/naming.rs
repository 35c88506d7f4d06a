/// Cluster name derivation
use rand::Rng;

use crate::error::{Result, StratusError};
use crate::resource::Reference;

pub const CLUSTER_NAME_PREFIX: &str = "pytorch-cluster-";

/// Length of the random part of a cluster name
pub const SUFFIX_LEN: usize = 8;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a lowercase alphanumeric suffix locally
pub fn generate_suffix() -> String {
    generate_suffix_with(&mut rand::thread_rng())
}

pub fn generate_suffix_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

fn is_valid_suffix(suffix: &str) -> bool {
    suffix.len() == SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Interpolate a concrete suffix into the cluster name template
pub fn derive_cluster_name(suffix: &str) -> Result<String> {
    if !is_valid_suffix(suffix) {
        return Err(StratusError::InvalidSuffix {
            suffix: suffix.to_string(),
            expected: SUFFIX_LEN,
        });
    }
    Ok(format!("{}{}", CLUSTER_NAME_PREFIX, suffix))
}

/// Cluster name resolved by the engine from a declared random string
pub fn cluster_name_from(suffix: &Reference) -> String {
    format!("{}{}", CLUSTER_NAME_PREFIX, suffix)
}

/// Whether `name` has the shape of a derived cluster name
pub fn is_cluster_name(name: &str) -> bool {
    name.strip_prefix(CLUSTER_NAME_PREFIX)
        .is_some_and(is_valid_suffix)
}
