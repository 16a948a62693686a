//! Bucket arithmetic for the hash-partitioned tree index.
//!
//! An entry's bucket at a given depth is one byte of the BLAKE3 hash of its
//! name, reduced modulo the fan-out. Each level of the trie consults the
//! next hash byte, so names colliding in one bucket are spread apart by a
//! different hash slice one level down. Depth is therefore bounded by the
//! hash width without any rebalancing.

/// Fan-out of a bucketed tree: number of bucket slots per node.
pub const BUCKET_COUNT: u32 = 32;

/// Maximum number of direct entries a tree holds before it is split into
/// buckets.
pub const DEFAULT_LEAF_THRESHOLD: usize = 512;

/// Deepest bucket level; one level per hash byte. A trie that still exceeds
/// the threshold here degrades to an oversized leaf rather than failing.
pub const MAX_BUCKET_DEPTH: usize = 31;

/// The bucket slot for `name` at the given trie depth.
pub fn bucket_index(name: &str, depth: usize) -> u32 {
    let hash = blake3::hash(name.as_bytes());
    let byte = hash.as_bytes()[depth.min(MAX_BUCKET_DEPTH)];
    u32::from(byte) % BUCKET_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_index_is_stable() {
        assert_eq!(bucket_index("roads/1", 0), bucket_index("roads/1", 0));
        assert_eq!(bucket_index("roads/1", 3), bucket_index("roads/1", 3));
    }

    #[test]
    fn bucket_index_is_always_in_range() {
        for i in 0..1000 {
            let name = format!("feature.{i}");
            for depth in [0, 1, 5, MAX_BUCKET_DEPTH, MAX_BUCKET_DEPTH + 10] {
                assert!(bucket_index(&name, depth) < BUCKET_COUNT);
            }
        }
    }

    #[test]
    fn colliding_names_spread_at_deeper_levels() {
        // Find two names that share a bucket at depth 0, then check that
        // some deeper level separates them.
        let base = "feature.0";
        for i in 1..10_000 {
            let other = format!("feature.{i}");
            if bucket_index(base, 0) == bucket_index(&other, 0) {
                let separated = (1..=MAX_BUCKET_DEPTH)
                    .any(|d| bucket_index(base, d) != bucket_index(&other, d));
                assert!(separated, "{base} and {other} collide at every depth");
                return;
            }
        }
        panic!("no depth-0 collision found in sample");
    }
}
