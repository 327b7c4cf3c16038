use std::sync::Once;

static FALLBACK_WARNED: Once = Once::new();

/// Bit-count of `XOR(a, b)` over the first `min(|a|, |b|)` bytes; any
/// excess bytes of the longer input are popcounted against zero (counted
/// whole, not discarded). For equal-length inputs this is the classical
/// Hamming distance used everywhere else in this crate. Zero-length
/// inputs distance to 0.
///
/// Operates word-at-a-time over 8-byte chunks with a byte-at-a-time tail,
/// generalizing the fixed-size-array approach the hashing core used to
/// rely on (`[usize; N]`) to the variable hash lengths `hash_size` now
/// permits. No allocation.
#[must_use]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut total = 0u32;

    let shorter_chunks = shorter.chunks_exact(8);
    let shorter_rem = shorter_chunks.remainder();
    let longer_chunks = longer[..shorter.len()].chunks_exact(8);

    for (x, y) in shorter_chunks.zip(longer_chunks) {
        total += popcount_xor_u64(read_u64(x), read_u64(y));
    }

    for (x, y) in shorter_rem.iter().zip(&longer[shorter.len() - shorter_rem.len()..shorter.len()]) {
        total += (x ^ y).count_ones();
    }

    // Excess bytes of the longer input, counted whole against an
    // implicit-zero tail.
    for &b in &longer[shorter.len()..] {
        total += b.count_ones();
    }

    total
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_ne_bytes(buf)
}

/// Popcounts `x ^ y` using the fastest available path, falling back to
/// the portable scalar one (`u64::count_ones`, itself typically compiled
/// to a single `popcnt`) if the accelerated path cannot run. A fallback
/// is logged exactly once per process, not once per call.
fn popcount_xor_u64(x: u64, y: u64) -> u32 {
    match simd_popcount_u64(x ^ y) {
        Some(count) => count,
        None => {
            FALLBACK_WARNED.call_once(|| {
                log::warn!("SIMD popcount unavailable, falling back to scalar count_ones");
            });
            (x ^ y).count_ones()
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn simd_popcount_u64(v: u64) -> Option<u32> {
    if std::is_x86_feature_detected!("popcnt") {
        // Safety: feature presence is checked immediately above.
        Some(unsafe { std::arch::x86_64::_popcnt64(v as i64) as u32 })
    } else {
        None
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn simd_popcount_u64(_v: u64) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn zero_length_inputs_are_distance_zero() {
        assert_eq!(hamming_distance(&[], &[]), 0);
    }

    #[test]
    fn identical_inputs_are_distance_zero() {
        let a = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(hamming_distance(&a, &a), 0);
    }

    #[test]
    fn single_bit_flip_is_distance_one() {
        let a = [0u8; 9];
        let mut b = a;
        b[3] = 0b0000_0001;
        assert_eq!(hamming_distance(&a, &b), 1);
    }

    #[test]
    fn excess_tail_bytes_of_longer_input_count_whole() {
        let a = [0xFFu8; 2];
        let b = [0xFFu8; 2 + 3]; // three extra all-ones bytes
        assert_eq!(hamming_distance(&a, &b), 3 * 8);
    }

    #[test]
    fn symmetric_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let len_a = rng.gen_range(0..40);
            let len_b = rng.gen_range(0..40);
            let a: Vec<u8> = (0..len_a).map(|_| rng.gen()).collect();
            let b: Vec<u8> = (0..len_b).map(|_| rng.gen()).collect();
            assert_eq!(hamming_distance(&a, &b), hamming_distance(&b, &a));
        }
    }

    #[test]
    fn identity_holds_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let len = rng.gen_range(0..40);
            let a: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            assert_eq!(hamming_distance(&a, &a), 0);
        }
    }
}
