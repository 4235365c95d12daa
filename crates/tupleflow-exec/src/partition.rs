//! Deterministic key → worker routing for partitioned execution.

use blake3::Hasher;

use tupleflow_core::tuple::FieldValue;

/// Stable partition index for a key: blake3 over a type tag plus canonical
/// little-endian bytes, reduced modulo the partition count.
pub fn partition_index(key: &FieldValue, num_partitions: usize) -> usize {
    let mut hasher = Hasher::new();
    hash_field(key, &mut hasher);
    let digest = hasher.finalize();
    let h = u64::from_le_bytes(digest.as_bytes()[0..8].try_into().unwrap());
    (h as usize) % num_partitions.max(1)
}

fn hash_field(value: &FieldValue, hasher: &mut Hasher) {
    use FieldValue::*;

    // Type discriminant first so e.g. Int(1) and Long(1) never collide.
    hasher.update(&[type_tag(value)]);

    match value {
        Null => {}
        Str(s) => {
            hasher.update(s.as_bytes());
        }
        Int(v) => {
            hasher.update(&v.to_le_bytes());
        }
        Long(v) | Timestamp(v) => {
            hasher.update(&v.to_le_bytes());
        }
        Double(v) => {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        Bool(v) => {
            hasher.update(&[*v as u8]);
        }
        Bytes(b) => {
            hasher.update(b);
        }
        List(items) => {
            for item in items {
                hash_field(item, hasher);
            }
        }
        Id(v) => {
            hasher.update(v.as_bytes());
        }
    }
}

fn type_tag(value: &FieldValue) -> u8 {
    use FieldValue::*;
    match value {
        Null => 0,
        Str(_) => 1,
        Int(_) => 2,
        Long(_) => 3,
        Double(_) => 4,
        Bool(_) => 5,
        Timestamp(_) => 6,
        Bytes(_) => 7,
        List(_) => 8,
        Id(_) => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_partition() {
        let a = FieldValue::Str("k1".into());
        let b = FieldValue::Str("k1".into());
        assert_eq!(partition_index(&a, 7), partition_index(&b, 7));
    }

    #[test]
    fn index_is_in_range() {
        for i in 0..100i64 {
            let idx = partition_index(&FieldValue::Long(i), 4);
            assert!(idx < 4);
        }
    }

    #[test]
    fn double_keys_hash_by_bit_pattern() {
        let a = FieldValue::Double(2.5);
        let b = FieldValue::Double(2.5);
        assert_eq!(partition_index(&a, 16), partition_index(&b, 16));
    }
}
