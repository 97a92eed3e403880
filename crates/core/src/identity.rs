use sha2::{Digest, Sha256};

/// `{source}-p{page}-{index}`. Page and index are integers, so parsing from
/// the right recovers the triple even when the source name contains `-p`.
pub fn chunk_id(source: &str, page: u32, index: usize) -> String {
    format!("{source}-p{page}-{index}")
}

/// Numeric point id for backends that only accept integer keys.
pub fn point_id(chunk_id: &str) -> u64 {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::{chunk_id, point_id};
    use std::collections::HashSet;

    #[test]
    fn chunk_id_has_expected_shape() {
        assert_eq!(chunk_id("a.pdf", 1, 0), "a.pdf-p1-0");
        assert_eq!(chunk_id("reports/q3.pdf", 12, 7), "reports/q3.pdf-p12-7");
    }

    #[test]
    fn chunk_ids_are_unique_over_neighbouring_triples() {
        let sources = ["a.pdf", "a.pdf-p1", "b-p1-2.pdf"];
        let mut seen = HashSet::new();
        for source in sources {
            for page in 1..=12 {
                for index in 0..12 {
                    assert!(seen.insert(chunk_id(source, page, index)));
                }
            }
        }
    }

    #[test]
    fn point_id_is_stable() {
        assert_eq!(point_id("a.pdf-p1-0"), point_id("a.pdf-p1-0"));
        assert_ne!(point_id("a.pdf-p1-0"), point_id("a.pdf-p1-1"));
    }
}
