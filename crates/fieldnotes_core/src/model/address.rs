//! Hierarchical note address helpers.
//!
//! # Responsibility
//! - Split, join and walk `Hardware//CPU//cache` style addresses.
//! - Stay pure: no I/O, no errors, any string is accepted.
//!
//! # Invariants
//! - Segments are trimmed; empty segments are kept so the validator can
//!   report them instead of silently dropping data.
//! - `ancestors` is ordered shallow-to-deep and never includes the address
//!   itself.

/// Separator between address segments.
pub const SEPARATOR: &str = "//";

/// Splits an address into trimmed segments.
pub fn parse(address: &str) -> Vec<String> {
    address
        .split(SEPARATOR)
        .map(|segment| segment.trim().to_string())
        .collect()
}

/// Joins segments back into canonical address form.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref().trim())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Re-joins an address with trimmed segments.
pub fn normalize(address: &str) -> String {
    join(&parse(address))
}

/// Returns the parent address, or `None` for a root-level address.
pub fn parent(address: &str) -> Option<String> {
    let segments = parse(address);
    if segments.len() < 2 {
        return None;
    }
    Some(join(&segments[..segments.len() - 1]))
}

/// Returns the last segment.
pub fn leaf(address: &str) -> String {
    parse(address).pop().unwrap_or_default()
}

/// Returns all strict prefixes, shallow-to-deep.
pub fn ancestors(address: &str) -> Vec<String> {
    let segments = parse(address);
    (1..segments.len())
        .map(|depth| join(&segments[..depth]))
        .collect()
}

/// Number of segments in the address.
pub fn depth(address: &str) -> usize {
    parse(address).len()
}

/// Whether any segment is empty after trimming.
pub fn has_empty_segment(address: &str) -> bool {
    parse(address).iter().any(|segment| segment.is_empty())
}

/// Whether `candidate` sits strictly below `address` in the hierarchy.
pub fn is_descendant_of(candidate: &str, address: &str) -> bool {
    let parent_segments = parse(address);
    let child_segments = parse(candidate);
    child_segments.len() > parent_segments.len()
        && child_segments[..parent_segments.len()] == parent_segments[..]
}
