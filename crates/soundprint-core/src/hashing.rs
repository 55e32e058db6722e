//! MinHash / LSH bucket computation and signature similarity

use crate::error::{Result, SoundprintError};
use crate::permutation::Permutations;
use crate::signature::Signature;
use std::sync::Arc;

/// Projects signatures into one bucket per hash table
#[derive(Debug, Clone)]
pub struct MinHasher {
    permutations: Arc<Permutations>,
}

impl MinHasher {
    pub fn new(permutations: Arc<Permutations>) -> Self {
        Self { permutations }
    }

    /// Bucket per table: the permuted bits read MSB-first
    pub fn hash(&self, signature: &Signature) -> Vec<i64> {
        self.permutations
            .tables()
            .iter()
            .map(|row| {
                row.iter()
                    .fold(0i64, |acc, &index| (acc << 1) | signature.get(index) as i64)
            })
            .collect()
    }
}

fn check_lengths(a: &Signature, b: &Signature) -> Result<()> {
    if a.len() != b.len() {
        return Err(SoundprintError::invalid(format!(
            "signature lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Number of differing bit positions
pub fn hamming_distance(a: &Signature, b: &Signature) -> Result<usize> {
    check_lengths(a, b)?;
    Ok(a.words()
        .iter()
        .zip(b.words())
        .map(|(x, y)| (x ^ y).count_ones() as usize)
        .sum())
}

/// |A ∩ B| / |A ∪ B| over set bits, 0 when both are empty
pub fn jaccard_similarity(a: &Signature, b: &Signature) -> Result<f64> {
    check_lengths(a, b)?;
    let (mut both, mut either) = (0u64, 0u64);
    for (x, y) in a.words().iter().zip(b.words()) {
        both += (x & y).count_ones() as u64;
        either += (x | y).count_ones() as u64;
    }
    if either == 0 {
        return Ok(0.0);
    }
    Ok(both as f64 / either as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permutation::generate_permutations;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn bits(pattern: &[u8]) -> Signature {
        Signature::from_bits(&pattern.iter().map(|&b| b == 1).collect::<Vec<_>>())
    }

    #[test]
    fn test_hamming_and_jaccard() {
        let a = bits(&[1, 1, 0, 0]);
        let b = bits(&[1, 0, 0, 1]);
        assert_eq!(hamming_distance(&a, &b).unwrap(), 2);
        assert_relative_eq!(jaccard_similarity(&a, &b).unwrap(), 1.0 / 3.0);
        assert_relative_eq!(jaccard_similarity(&a, &a).unwrap(), 1.0);
        assert_eq!(hamming_distance(&a, &a).unwrap(), 0);
    }

    #[test]
    fn test_all_zero_jaccard_is_zero() {
        let zero = Signature::new(100);
        assert_eq!(jaccard_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let a = Signature::new(8);
        let b = Signature::new(9);
        assert!(matches!(
            hamming_distance(&a, &b),
            Err(SoundprintError::InvalidInput(_))
        ));
        assert!(jaccard_similarity(&a, &b).is_err());
    }

    #[test]
    fn test_bucket_is_msb_first() {
        let perms = Permutations::new(vec![vec![0, 1, 2, 3], vec![3, 2, 1, 0], vec![1, 2]]);
        // ragged rows are rejected
        assert!(perms.is_err());

        let perms = Permutations::new(vec![vec![0, 1, 2, 3], vec![3, 2, 1, 0]]).unwrap();
        let hasher = MinHasher::new(Arc::new(perms));
        let sig = bits(&[1, 0, 1, 1]);
        assert_eq!(hasher.hash(&sig), vec![0b1011, 0b1101]);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(21);
        let perms = generate_permutations(20, 16, 0, 512, &mut rng).unwrap();
        let hasher = MinHasher::new(Arc::new(perms));

        for _ in 0..10 {
            let sig = Signature::from_bits(&(0..512).map(|_| rng.gen_bool(0.1)).collect::<Vec<_>>());
            let first = hasher.hash(&sig);
            assert_eq!(first.len(), 20);
            assert_eq!(first, hasher.hash(&sig.clone()));
            assert!(first.iter().all(|&b| (0..1 << 16).contains(&b)));
        }
    }
}
