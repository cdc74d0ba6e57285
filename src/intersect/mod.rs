//! Phrase adjacency intersection of packed posting lists.
//!
//! Intersecting `lhs` with `rhs` for a phrase offset `n` keeps the positions
//! `p` of `rhs` such that `p - n` occurs in `lhs` for the same document. The
//! whole 16-position group is shifted and masked at once, so it takes two
//! passes: the first handles matches inside a group and collects carry
//! candidates whose high bits overflow into the next group, the second
//! resolves those carries with a rotate. Both results are then merged.
//!
//! Three strategies implement the passes and must produce identical output:
//! a scalar merge join, an exponential search variant for skewed list
//! lengths and an AVX-512 variant processing eight words per step.

pub mod gallop;
pub mod naive;
pub mod simd;

use log::trace;

use crate::packed::{
    ADD_ONE_GROUP, BorrowRoaringishPacked, RoaringishPacked, clear_values, unpack_values,
};
use crate::stats::Stats;

pub use self::gallop::GallopIntersect;
pub use self::naive::NaiveIntersect;
pub use self::simd::SimdIntersect;

/// Length ratio at which the first pass switches to galloping.
pub const FIRST_GALLOP_RATIO: usize = 650;

/// Length ratio at which the second pass switches to galloping.
pub const SECOND_GALLOP_RATIO: usize = 120;

/// Shift and masks derived from the phrase offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntersectParams {
    /// Whole groups spanned by the offset, pre-multiplied by `ADD_ONE_GROUP`.
    pub add_to_group: u64,
    /// Offset modulo 16.
    pub lhs_len: u16,
    /// Bits that overflow into the next group after shifting by `lhs_len`.
    pub msb_mask: u16,
    /// Bits that receive the overflow in the next group.
    pub lsb_mask: u16,
}

impl IntersectParams {
    pub fn new(lhs_len_full: u32) -> Self {
        let lhs_len = (lhs_len_full % 16) as u16;
        IntersectParams {
            add_to_group: (lhs_len_full / 16) as u64 * ADD_ONE_GROUP,
            lhs_len,
            msb_mask: !(u16::MAX >> lhs_len),
            lsb_mask: !(u16::MAX << lhs_len),
        }
    }
}

/// One intersection strategy.
///
/// `first_pass` appends one word per `(docId, group)` match to `packed`
/// (possibly with an empty bitmap) and, for every `lhs` word whose key is not
/// above the last `rhs` key and whose bitmap has bits under `msb_mask`, the
/// word moved one group forward to `msb`. `second_pass` intersects such carry
/// words against `rhs` with a rotate instead of a shift.
pub trait Intersect: Send + Sync {
    fn name(&self) -> &'static str;

    fn first_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
        msb: &mut RoaringishPacked,
    );

    fn second_pass(
        &self,
        lhs: &[u64],
        rhs: &[u64],
        params: &IntersectParams,
        packed: &mut RoaringishPacked,
    );
}

/// Available strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Naive,
    Gallop,
    Simd,
}

impl Strategy {
    /// Default strategy for this machine.
    pub fn default_for(force_naive: bool) -> Self {
        if force_naive || !simd::is_available() {
            Strategy::Naive
        } else {
            Strategy::Simd
        }
    }

    /// Gallop when the longer list is at least `gallop_ratio` times the
    /// shorter one, otherwise use `default`.
    pub fn select(lhs_len: usize, rhs_len: usize, gallop_ratio: usize, default: Strategy) -> Self {
        let (min, max) = if lhs_len < rhs_len {
            (lhs_len, rhs_len)
        } else {
            (rhs_len, lhs_len)
        };
        if min > 0 && max / min >= gallop_ratio {
            Strategy::Gallop
        } else {
            default
        }
    }

    pub fn intersector(self) -> &'static dyn Intersect {
        match self {
            Strategy::Naive => &NaiveIntersect,
            Strategy::Gallop => &GallopIntersect,
            Strategy::Simd => &SimdIntersect,
        }
    }
}

/// Runs both passes and merges their results.
#[derive(Clone, Copy, Debug)]
pub struct Intersector {
    default: Strategy,
}

impl Intersector {
    pub fn new(force_naive: bool) -> Self {
        Intersector {
            default: Strategy::default_for(force_naive),
        }
    }

    pub fn with_strategy(default: Strategy) -> Self {
        Intersector { default }
    }

    pub fn default_strategy(&self) -> Strategy {
        self.default
    }

    /// Positions of `rhs` preceded by `lhs` exactly `lhs_len_full` positions
    /// earlier in the same document.
    pub fn intersect(
        &self,
        lhs: BorrowRoaringishPacked<'_>,
        rhs: BorrowRoaringishPacked<'_>,
        lhs_len_full: u32,
        stats: &Stats,
    ) -> RoaringishPacked {
        if lhs.is_empty() || rhs.is_empty() {
            return RoaringishPacked::new();
        }

        let params = IntersectParams::new(lhs_len_full);

        let first = Strategy::select(lhs.len(), rhs.len(), FIRST_GALLOP_RATIO, self.default);
        trace!(
            "first pass: {:?} lhs={} rhs={} len={}",
            first,
            lhs.len(),
            rhs.len(),
            lhs_len_full
        );
        let mut packed = RoaringishPacked::with_capacity(lhs.len().min(rhs.len()) + 1 + 8);
        let mut msb = RoaringishPacked::with_capacity(lhs.len() + 1);
        stats.first_intersect.time(|| {
            first
                .intersector()
                .first_pass(&lhs, &rhs, &params, &mut packed, &mut msb)
        });

        if msb.is_empty() {
            packed.retain_non_empty();
            return packed;
        }

        let second = Strategy::select(msb.len(), rhs.len(), SECOND_GALLOP_RATIO, self.default);
        trace!("second pass: {:?} carries={}", second, msb.len());
        let mut carried = RoaringishPacked::with_capacity(msb.len().min(rhs.len()) + 1 + 8);
        stats
            .second_intersect
            .time(|| second.intersector().second_pass(&msb, &rhs, &params, &mut carried));
        drop(msb);

        stats
            .merge_results
            .time(|| merge_results(&packed, &carried))
    }
}

impl Default for Intersector {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Merge two sorted word lists, OR-ing words with the same key and dropping
/// words with an empty bitmap.
pub fn merge_results(packed: &[u64], carried: &[u64]) -> RoaringishPacked {
    let mut result = RoaringishPacked::with_capacity(packed.len() + carried.len());
    let mut push = |word: u64| {
        if unpack_values(word) != 0 {
            result.push_word(word);
        }
    };

    let (mut i, mut j) = (0, 0);
    while i < packed.len() && j < carried.len() {
        let lhs = packed[i];
        let rhs = carried[j];
        let (lhs_key, rhs_key) = (clear_values(lhs), clear_values(rhs));
        if lhs_key == rhs_key {
            push(lhs | rhs);
            i += 1;
            j += 1;
        } else if lhs_key < rhs_key {
            push(lhs);
            i += 1;
        } else {
            push(rhs);
            j += 1;
        }
    }
    packed[i..].iter().for_each(|&w| push(w));
    carried[j..].iter().for_each(|&w| push(w));

    result
}
