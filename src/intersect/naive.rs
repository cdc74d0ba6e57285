//! Scalar two-pointer intersection.

use std::cmp::Ordering;

use super::{Intersect, IntersectParams};
use crate::packed::{ADD_ONE_GROUP, RoaringishPacked, clear_values, unpack_values};

/// Branch-per-comparison merge join. Always available and the reference
/// output for the other strategies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveIntersect;

impl Intersect for NaiveIntersect {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn first_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
        msb: &mut RoaringishPacked,
    ) {
        first_pass_from(lhs, rhs, 0, 0, params, packed, msb);
    }

    fn second_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
    ) {
        second_pass_from(lhs, rhs, 0, 0, params, packed);
    }
}

#[inline(always)]
pub(crate) fn push_carry(lhs_packed: u64, params: &IntersectParams, msb: &mut RoaringishPacked) {
    if unpack_values(lhs_packed) & params.msb_mask != 0 {
        msb.push_word(lhs_packed + ADD_ONE_GROUP);
    }
}

/// First pass starting at `lhs[i]` and `rhs[j]`.
pub(crate) fn first_pass_from(
    lhs: &[u64],
    rhs: &[u64],
    mut i: usize,
    mut j: usize,
    params: &IntersectParams,
    packed: &mut RoaringishPacked,
    msb: &mut RoaringishPacked,
) {
    while i < lhs.len() && j < rhs.len() {
        let lhs_packed = lhs[i] + params.add_to_group;
        let lhs_key = clear_values(lhs_packed);
        let rhs_key = clear_values(rhs[j]);

        match lhs_key.cmp(&rhs_key) {
            Ordering::Equal => {
                let lhs_values = unpack_values(lhs_packed);
                let rhs_values = unpack_values(rhs[j]);
                let intersection = (lhs_values << params.lhs_len) & rhs_values;
                packed.push_word(lhs_key | intersection as u64);
                push_carry(lhs_packed, params, msb);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                push_carry(lhs_packed, params, msb);
                i += 1;
            }
            Ordering::Greater => j += 1,
        }
    }
}

/// Second pass starting at `lhs[i]` and `rhs[j]`.
pub(crate) fn second_pass_from(
    lhs: &[u64],
    rhs: &[u64],
    mut i: usize,
    mut j: usize,
    params: &IntersectParams,
    packed: &mut RoaringishPacked,
) {
    while i < lhs.len() && j < rhs.len() {
        let lhs_key = clear_values(lhs[i]);
        let rhs_key = clear_values(rhs[j]);

        match lhs_key.cmp(&rhs_key) {
            Ordering::Equal => {
                let lhs_values = unpack_values(lhs[i]);
                let rhs_values = unpack_values(rhs[j]);
                let intersection =
                    lhs_values.rotate_left(params.lhs_len as u32) & params.lsb_mask & rhs_values;
                packed.push_word(lhs_key | intersection as u64);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::tests::run_passes;
    use crate::intersect::Strategy;
    use crate::packed::pack;

    #[test]
    fn test_first_pass_keeps_empty_matches() {
        let lhs = [pack(0, 0, 0b0001), pack(1, 0, 0b0100)];
        let rhs = [pack(0, 0, 0b0010), pack(1, 0, 0b0001)];

        let (packed, msb, _) = run_passes(Strategy::Naive, &lhs, &rhs, 1);
        assert_eq!(packed, vec![pack(0, 0, 0b0010), pack(1, 0, 0)]);
        assert!(msb.is_empty());
    }

    #[test]
    fn test_carry_only_up_to_last_rhs_key() {
        let lhs = [pack(0, 0, 0x8000), pack(0, 3, 0x8000), pack(5, 0, 0x8000)];
        let rhs = [pack(0, 1, 0b1), pack(0, 4, 0b1)];

        let (packed, msb, second) = run_passes(Strategy::Naive, &lhs, &rhs, 1);
        assert!(packed.is_empty());
        assert_eq!(msb, vec![pack(0, 1, 0x8000), pack(0, 4, 0x8000)]);
        assert_eq!(second, vec![pack(0, 1, 0b1), pack(0, 4, 0b1)]);
    }

    #[test]
    fn test_second_pass_rotates_carried_bits() {
        let lhs = [pack(3, 2, 0xC000)];
        let rhs = [pack(3, 2, 0b0011)];
        let params = IntersectParams::new(2);

        let mut packed = RoaringishPacked::new();
        NaiveIntersect.second_pass(&lhs, &rhs, &params, &mut packed);
        assert_eq!(packed.as_slice(), &[pack(3, 2, 0b0011)]);
    }
}
