use crate::models::QueryResult;
use crate::StoreError;
use std::cmp::Ordering;

pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollectionName(name.to_string()))
    }
}

/// Ascending distance, id as tie-breaker, cut to `k`.
pub fn rank_hits(mut hits: Vec<QueryResult>, k: usize) -> Vec<QueryResult> {
    hits.sort_by(|left, right| match left.distance.total_cmp(&right.distance) {
        Ordering::Equal => left.id.cmp(&right.id),
        other => other,
    });
    hits.truncate(k);
    hits
}
