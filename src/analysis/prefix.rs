//! Prefix expansion over the indexed vocabulary.

use fst::automaton::{Automaton, Str};
use fst::{IntoStreamer, Set};
use log::warn;

use crate::error::{Result, RoaringishError};

/// Expands a prefix into the vocabulary tokens starting with it.
pub trait PrefixMatcher: Send + Sync {
    /// Matching tokens in byte order.
    fn matches(&self, prefix: &str) -> Vec<String>;
}

/// Prefix matcher over an immutable finite state transducer set.
#[derive(Debug)]
pub struct FstPrefixMatcher {
    set: Set<Vec<u8>>,
}

impl FstPrefixMatcher {
    /// Build the matcher from tokens in any order, duplicates allowed.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_owned()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let set = Set::from_iter(sorted)
            .map_err(|e| RoaringishError::storage(format!("Failed to build prefix set: {e}")))?;
        Ok(FstPrefixMatcher { set })
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl PrefixMatcher for FstPrefixMatcher {
    fn matches(&self, prefix: &str) -> Vec<String> {
        let automaton = Str::new(prefix).starts_with();
        match self.set.search(automaton).into_stream().into_strs() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Prefix expansion of {prefix:?} failed: {e}");
                Vec::new()
            }
        }
    }
}
