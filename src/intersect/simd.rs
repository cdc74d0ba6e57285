//! AVX-512 intersection processing eight packed words per side and step.
//!
//! Matching lanes are found by comparing one block against rotations of the
//! other, a shuffle based replacement for `vp2intersectq`. Matches are
//! compressed to the front of the register, shifted or rotated and masked in
//! bulk. Blocks that do not fill a register are handed to the scalar code,
//! and the whole intersection runs scalar when `avx512f` is missing.

use super::naive;
use super::{Intersect, IntersectParams};
use crate::packed::RoaringishPacked;

/// Eight-lane vectorized intersection.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimdIntersect;

/// Whether the running CPU supports the vectorized strategy.
pub fn is_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx512f")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

impl Intersect for SimdIntersect {
    fn name(&self) -> &'static str {
        "simd"
    }

    fn first_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
        msb: &mut RoaringishPacked,
    ) {
        run::<true>(lhs, rhs, params, packed, msb);
    }

    fn second_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
    ) {
        let mut unused = RoaringishPacked::new();
        run::<false>(lhs, rhs, params, packed, &mut unused);
    }
}

#[cfg(target_arch = "x86_64")]
fn run<const FIRST: bool>(
    lhs: &[u64],
    rhs: &[u64],
    params: &IntersectParams,
    packed: &mut RoaringishPacked,
    msb: &mut RoaringishPacked,
) {
    if is_available() {
        // SAFETY: avx512f support was checked at runtime.
        unsafe { avx512::intersect::<FIRST>(lhs, rhs, params, packed, msb) }
    } else {
        scalar::<FIRST>(lhs, rhs, params, packed, msb)
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn run<const FIRST: bool>(
    lhs: &[u64],
    rhs: &[u64],
    params: &IntersectParams,
    packed: &mut RoaringishPacked,
    msb: &mut RoaringishPacked,
) {
    scalar::<FIRST>(lhs, rhs, params, packed, msb)
}

fn scalar<const FIRST: bool>(
    lhs: &[u64],
    rhs: &[u64],
    params: &IntersectParams,
    packed: &mut RoaringishPacked,
    msb: &mut RoaringishPacked,
) {
    if FIRST {
        naive::first_pass_from(lhs, rhs, 0, 0, params, packed, msb);
    } else {
        naive::second_pass_from(lhs, rhs, 0, 0, params, packed);
    }
}

#[cfg(target_arch = "x86_64")]
mod avx512 {
    use std::arch::x86_64::*;

    use super::naive;
    use crate::intersect::IntersectParams;
    use crate::packed::{ADD_ONE_GROUP, RoaringishPacked, clear_values, unpack_values};

    const N: usize = 8;

    /// Lane masks of the words of `a` found in `b` and of `b` found in `a`.
    ///
    /// `a` is rotated by two, four and six lanes and `b` has adjacent lane
    /// pairs swapped, so the eight comparisons cover every lane pair.
    #[inline]
    #[target_feature(enable = "avx512f")]
    unsafe fn vp2intersectq(a: __m512i, b: __m512i) -> (u8, u8) {
        let a1 = _mm512_alignr_epi32::<4>(a, a);
        let a2 = _mm512_alignr_epi32::<8>(a, a);
        let a3 = _mm512_alignr_epi32::<12>(a, a);
        let b1 = _mm512_shuffle_epi32::<_MM_PERM_BADC>(b);

        let m00 = _mm512_cmpeq_epi64_mask(a, b);
        let m01 = _mm512_cmpeq_epi64_mask(a, b1);
        let m10 = _mm512_cmpeq_epi64_mask(a1, b);
        let m11 = _mm512_cmpeq_epi64_mask(a1, b1);
        let m20 = _mm512_cmpeq_epi64_mask(a2, b);
        let m21 = _mm512_cmpeq_epi64_mask(a2, b1);
        let m30 = _mm512_cmpeq_epi64_mask(a3, b);
        let m31 = _mm512_cmpeq_epi64_mask(a3, b1);

        let mask_a = m00
            | m01
            | (m10 | m11).rotate_left(2)
            | (m20 | m21).rotate_left(4)
            | (m30 | m31).rotate_left(6);

        let m0 = m00 | m10 | m20 | m30;
        let m1 = m01 | m11 | m21 | m31;
        let mask_b = m0 | ((m1 & 0x55) << 1) | ((m1 >> 1) & 0x55);

        (mask_a, mask_b)
    }

    /// Append the first `count` lanes of `v`.
    #[inline]
    #[target_feature(enable = "avx512f")]
    unsafe fn store_prefix(
        v: __m512i,
        count: u32,
        out: &mut RoaringishPacked,
        scratch: &mut [u64; N],
    ) {
        // SAFETY: scratch holds exactly eight words.
        unsafe { _mm512_storeu_epi64(scratch.as_mut_ptr() as *mut i64, v) };
        out.extend_from_slice(&scratch[..count as usize]);
    }

    /// # Safety
    ///
    /// The CPU must support `avx512f`.
    #[target_feature(enable = "avx512f")]
    pub(super) unsafe fn intersect<const FIRST: bool>(
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
        msb: &mut RoaringishPacked,
    ) {
        let end_lhs = lhs.len() / N * N;
        let end_rhs = rhs.len() / N * N;

        let add = if FIRST { params.add_to_group } else { 0 };
        let add_v = _mm512_set1_epi64(add as i64);
        let key_mask = _mm512_set1_epi64(!0xFFFF);
        let value_mask = _mm512_set1_epi64(0xFFFF);
        let msb_mask = _mm512_set1_epi64(params.msb_mask as i64);
        let lsb_mask = _mm512_set1_epi64(params.lsb_mask as i64);
        let shift = _mm512_set1_epi64(params.lhs_len as i64);
        let back_shift = _mm512_set1_epi64(16 - params.lhs_len as i64);
        let one_group = _mm512_set1_epi64(ADD_ONE_GROUP as i64);

        let mut scratch = [0u64; N];
        let (mut i, mut j) = (0, 0);

        while i < end_lhs && j < end_rhs {
            let lhs_last = clear_values(lhs[i + N - 1]) + add;
            let rhs_last = clear_values(rhs[j + N - 1]);

            // SAFETY: i + 8 <= lhs.len() and j + 8 <= rhs.len().
            let (lhs_pack, rhs_pack) = unsafe {
                (
                    _mm512_add_epi64(_mm512_loadu_epi64(lhs.as_ptr().add(i) as *const i64), add_v),
                    _mm512_loadu_epi64(rhs.as_ptr().add(j) as *const i64),
                )
            };
            let lhs_keys = _mm512_and_si512(lhs_pack, key_mask);
            let rhs_keys = _mm512_and_si512(rhs_pack, key_mask);

            // SAFETY: avx512f is enabled for this function.
            let (lhs_mask, rhs_mask) = unsafe { vp2intersectq(lhs_keys, rhs_keys) };

            if lhs_mask != 0 {
                let lhs_matched = _mm512_maskz_compress_epi64(lhs_mask, lhs_pack);
                let rhs_matched = _mm512_maskz_compress_epi64(rhs_mask, rhs_pack);
                let lhs_values = _mm512_and_si512(lhs_matched, value_mask);
                let rhs_values = _mm512_and_si512(rhs_matched, value_mask);

                let moved = if FIRST {
                    _mm512_sllv_epi64(lhs_values, shift)
                } else {
                    let rotated = _mm512_or_si512(
                        _mm512_sllv_epi64(lhs_values, shift),
                        _mm512_srlv_epi64(lhs_values, back_shift),
                    );
                    _mm512_and_si512(rotated, lsb_mask)
                };
                let intersection = _mm512_and_si512(moved, rhs_values);
                let result =
                    _mm512_or_si512(_mm512_and_si512(lhs_matched, key_mask), intersection);

                // SAFETY: avx512f is enabled for this function.
                unsafe { store_prefix(result, lhs_mask.count_ones(), packed, &mut scratch) };
            }

            if lhs_last <= rhs_last {
                if FIRST {
                    let carry_mask = _mm512_test_epi64_mask(lhs_pack, msb_mask);
                    if carry_mask != 0 {
                        let carries = _mm512_maskz_compress_epi64(
                            carry_mask,
                            _mm512_add_epi64(lhs_pack, one_group),
                        );
                        // SAFETY: avx512f is enabled for this function.
                        unsafe { store_prefix(carries, carry_mask.count_ones(), msb, &mut scratch) };
                    }
                }
                i += N;
            }
            if rhs_last <= lhs_last {
                j += N;
            }
        }

        if !FIRST {
            naive::second_pass_from(lhs, rhs, i, j, params, packed);
        } else if j < rhs.len() {
            naive::first_pass_from(lhs, rhs, i, j, params, packed, msb);
        } else if let Some(&last) = rhs.last() {
            // rhs was consumed by whole blocks while the current lhs block
            // was not; its carries up to the last rhs key are still owed.
            let rhs_max = clear_values(last);
            for &word in &lhs[i..] {
                let lhs_packed = word + add;
                if clear_values(lhs_packed) > rhs_max {
                    break;
                }
                if unpack_values(lhs_packed) & params.msb_mask != 0 {
                    msb.push_word(lhs_packed + ADD_ONE_GROUP);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::Strategy;
    use crate::intersect::tests::{random_postings, run_passes};
    use crate::packed::pack;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_equivalent(lhs: &[u64], rhs: &[u64], len: u32) {
        let simd = run_passes(Strategy::Simd, lhs, rhs, len);
        let naive = run_passes(Strategy::Naive, lhs, rhs, len);
        assert_eq!(simd, naive, "len {len}");
    }

    #[test]
    fn test_random_lists_match_naive() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let len = rng.random_range(1..40);
            let (lhs_docs, rhs_docs) = (rng.random_range(1..200), rng.random_range(1..200));
            let lhs = random_postings(&mut rng, lhs_docs, 1, 48, 0.25);
            let rhs = random_postings(&mut rng, rhs_docs, 1, 48, 0.25);
            assert_equivalent(&lhs, &rhs, len);
        }
    }

    #[test]
    fn test_all_match() {
        let words: Vec<u64> = (0..64).map(|d| pack(d, 0, 0xFFFF)).collect();
        for len in [1, 7, 15, 16, 17] {
            assert_equivalent(&words, &words, len);
        }
    }

    #[test]
    fn test_no_match() {
        let lhs: Vec<u64> = (0..64).map(|d| pack(d * 2, 0, 0x8001)).collect();
        let rhs: Vec<u64> = (0..64).map(|d| pack(d * 2 + 1, 0, 0x0003)).collect();
        assert_equivalent(&lhs, &rhs, 1);
        assert_equivalent(&rhs, &lhs, 1);
    }

    #[test]
    fn test_partial_overlap_and_boundaries() {
        // Every lhs word carries, rhs keeps only every third group.
        let lhs: Vec<u64> = (0..100).map(|g| pack(g / 10, (g % 10) as u16, 0xC001)).collect();
        let rhs: Vec<u64> = (0..100)
            .filter(|g| g % 3 == 0)
            .map(|g| pack(g / 10, (g % 10) as u16, 0x0003))
            .collect();
        for len in [1, 2, 14, 15, 16, 18] {
            assert_equivalent(&lhs, &rhs, len);
            assert_equivalent(&rhs, &lhs, len);
        }
    }

    #[test]
    fn test_rhs_exhausted_by_blocks() {
        // rhs is exactly one block and ends inside the first lhs block.
        let lhs: Vec<u64> = (0..16).map(|d| pack(d, 0, 0x8000)).collect();
        let rhs: Vec<u64> = (0..8).map(|d| pack(d, 1, 0x0001)).collect();
        assert_equivalent(&lhs, &rhs, 1);

        let skewed = random_postings(&mut StdRng::seed_from_u64(3), 300, 1, 16, 0.5);
        let small: Vec<u64> = skewed.iter().step_by(37).copied().take(8).collect();
        assert_equivalent(&skewed, &small, 1);
        assert_equivalent(&small, &skewed, 1);
    }
}
