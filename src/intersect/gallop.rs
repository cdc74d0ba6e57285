//! Exponential search intersection for lists of very different lengths.

use super::naive::push_carry;
use super::{Intersect, IntersectParams};
use crate::packed::{RoaringishPacked, clear_values, unpack_values};

/// Two-pointer intersection that skips runs of smaller keys with doubling
/// strides followed by a binary search.
#[derive(Clone, Copy, Debug, Default)]
pub struct GallopIntersect;

/// First index at or after `from` whose key plus `add` is not below `target`.
///
/// `words[from]` must be below `target`.
#[inline]
fn gallop(words: &[u64], from: usize, add: u64, target: u64) -> usize {
    let below = |w: &u64| clear_values(*w) + add < target;

    let mut lo = from;
    let mut step = 1;
    let mut hi = from + 1;
    while hi < words.len() && below(&words[hi]) {
        lo = hi;
        step *= 2;
        hi = lo + step;
    }
    let hi = hi.min(words.len());

    lo + 1 + words[lo + 1..hi].partition_point(below)
}

impl Intersect for GallopIntersect {
    fn name(&self) -> &'static str {
        "gallop"
    }

    fn first_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
        msb: &mut RoaringishPacked,
    ) {
        let add = params.add_to_group;
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            let lhs_packed = lhs[i] + add;
            let lhs_key = clear_values(lhs_packed);
            let rhs_key = clear_values(rhs[j]);

            if lhs_key == rhs_key {
                let intersection =
                    (unpack_values(lhs_packed) << params.lhs_len) & unpack_values(rhs[j]);
                packed.push_word(lhs_key | intersection as u64);
                push_carry(lhs_packed, params, msb);
                i += 1;
                j += 1;
            } else if lhs_key < rhs_key {
                // Skipped lhs words can still carry into a later rhs group.
                let next = gallop(lhs, i, add, rhs_key);
                for &word in &lhs[i..next] {
                    push_carry(word + add, params, msb);
                }
                i = next;
            } else {
                j = gallop(rhs, j, 0, lhs_key);
            }
        }
    }

    fn second_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
    ) {
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            let lhs_key = clear_values(lhs[i]);
            let rhs_key = clear_values(rhs[j]);

            if lhs_key == rhs_key {
                let intersection = unpack_values(lhs[i]).rotate_left(params.lhs_len as u32)
                    & params.lsb_mask
                    & unpack_values(rhs[j]);
                packed.push_word(lhs_key | intersection as u64);
                i += 1;
                j += 1;
            } else if lhs_key < rhs_key {
                i = gallop(lhs, i, 0, rhs_key);
            } else {
                j = gallop(rhs, j, 0, lhs_key);
            }
        }
    }
}
