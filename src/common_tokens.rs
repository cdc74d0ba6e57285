//! Fusion of frequent tokens into multi-word units.
//!
//! Posting lists of very frequent tokens are long and make phrase queries
//! slow. When such a token is indexed, the runs it forms with its neighbours
//! (up to [`MAX_WINDOW_LEN`] tokens) are indexed as well, under the tokens
//! joined by a single space and at the position of the first one. A query
//! later picks the partition of its tokens into such units that touches the
//! fewest packed words.
//!
//! Both sides derive candidate units from [`window_end`], so every unit a
//! query may ask for was indexed wherever the words occur.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use log::{debug, warn};

use crate::config::CommonTokensConfig;
use crate::error::{Result, RoaringishError};
use crate::storage::structured::{StructReader, StructWriter, is_truncated};

/// Longest run of tokens fused into one unit.
pub const MAX_WINDOW_LEN: usize = 3;

/// Joins the tokens of a merged unit.
pub const SEPARATOR: char = ' ';

/// A token, or a run of tokens fused into one, as it is looked up in the
/// token directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenUnit {
    pub token: String,
    /// Number of original tokens covered.
    pub len: u32,
}

impl TokenUnit {
    pub fn single(token: impl Into<String>) -> Self {
        TokenUnit {
            token: token.into(),
            len: 1,
        }
    }

    fn merged(tokens: &[String]) -> Self {
        TokenUnit {
            token: join(tokens),
            len: tokens.len() as u32,
        }
    }
}

fn join(tokens: &[String]) -> String {
    let mut joined = String::with_capacity(tokens.iter().map(|t| t.len() + 1).sum());
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            joined.push(SEPARATOR);
        }
        joined.push_str(token);
    }
    joined
}

/// The set of common tokens of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonTokens {
    tokens: AHashSet<String>,
}

impl CommonTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Choose the common tokens according to `config`, given the number of
    /// occurrences of every token in the sample.
    pub fn select(config: &CommonTokensConfig, frequencies: &AHashMap<String, u64>) -> Self {
        let top = |n: usize| {
            let mut by_freq: Vec<(&String, &u64)> = frequencies.iter().collect();
            by_freq.sort_unstable_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            by_freq
                .into_iter()
                .take(n)
                .map(|(token, _)| token.clone())
                .collect::<AHashSet<_>>()
        };

        let tokens = match config {
            CommonTokensConfig::None => AHashSet::new(),
            CommonTokensConfig::List(list) => list.iter().cloned().collect(),
            CommonTokensConfig::FixedNum(n) => top(*n),
            CommonTokensConfig::Percentage(fraction) => {
                let fraction = fraction.clamp(0.0, 1.0);
                top((frequencies.len() as f64 * fraction) as usize)
            }
        };
        debug!(
            "Selected {} common tokens out of {} sampled",
            tokens.len(),
            frequencies.len()
        );
        CommonTokens { tokens }
    }

    /// Write `common_tokens.bin`: an `i32` count then length-prefixed tokens.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut sorted: Vec<&String> = self.tokens.iter().collect();
        sorted.sort_unstable();

        let mut writer = StructWriter::new(BufWriter::new(File::create(path)?));
        writer.write_i32(sorted.len() as i32)?;
        for token in sorted {
            writer.write_string(token)?;
        }
        writer.finish()?;
        Ok(())
    }

    /// Read `common_tokens.bin`. A missing file is an empty set and a
    /// truncated one keeps the tokens read before the damage.
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut common = CommonTokens::new();
        if !path.exists() {
            return Ok(common);
        }

        let mut reader = StructReader::new(BufReader::new(File::open(path)?));
        let count = match reader.read_i32() {
            Ok(count) => count,
            Err(e) if is_truncated(&e) => return Ok(common),
            Err(e) => return Err(e),
        };
        for _ in 0..count.max(0) {
            match reader.read_string() {
                Ok(token) => {
                    common.tokens.insert(token);
                }
                Err(e) if is_truncated(&e) => {
                    warn!(
                        "Common token file {} is truncated after {} of {count} tokens",
                        path.display(),
                        common.len()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(common)
    }

    /// One past the longest unit that may start at `tokens[0]`.
    ///
    /// A unit `tokens[..k]` is a candidate for every `k` in `1..end`.
    pub fn window_end(&self, tokens: &[String]) -> usize {
        if tokens.is_empty() || self.is_empty() {
            return tokens.len().min(1) + 1;
        }
        let mut end = tokens
            .iter()
            .skip(1)
            .take(MAX_WINDOW_LEN - 1)
            .take_while(|t| self.contains(t))
            .count()
            + 2;
        if self.contains(&tokens[0]) {
            end += 1;
        }
        end.min(MAX_WINDOW_LEN + 1).min(tokens.len() + 1)
    }

    /// Merged units to index for a document, as `(position, unit)` pairs.
    ///
    /// Single tokens are not included.
    pub fn merged_units(&self, tokens: &[String]) -> Vec<(u32, String)> {
        let mut units = Vec::new();
        if self.is_empty() {
            return units;
        }
        for start in 0..tokens.len() {
            let rest = &tokens[start..];
            for k in 2..self.window_end(rest) {
                units.push((start as u32, join(&rest[..k])));
            }
        }
        units
    }

    /// Partition query tokens into units with the least total cost.
    ///
    /// `cost` returns the number of packed words of a unit, `None` when it
    /// is not in the index. Missing units cost nothing and so always win,
    /// which lets the caller fail fast on them. Among equal costs the longer
    /// unit is preferred.
    pub fn minimize<F>(&self, tokens: &[String], mut cost: F) -> Result<Vec<TokenUnit>>
    where
        F: FnMut(&str) -> Result<Option<usize>>,
    {
        if self.is_empty() {
            return Ok(tokens.iter().cloned().map(TokenUnit::single).collect());
        }

        let n = tokens.len();
        let mut memo: AHashMap<String, usize> = AHashMap::new();
        // best[i]: least cost of tokens[i..] and the length of its first unit.
        let mut best = vec![(0usize, 0usize); n + 1];
        for start in (0..n).rev() {
            let rest = &tokens[start..];
            let mut choice: Option<(usize, usize)> = None;
            for k in (1..self.window_end(rest)).rev() {
                let key = join(&rest[..k]);
                let unit_cost = match memo.get(&key) {
                    Some(&c) => c,
                    None => {
                        let c = cost(&key)?.unwrap_or(0);
                        memo.insert(key, c);
                        c
                    }
                };
                let total = unit_cost.saturating_add(best[start + k].0);
                if choice.is_none_or(|(c, _)| total < c) {
                    choice = Some((total, k));
                }
            }
            best[start] = choice.ok_or_else(|| {
                RoaringishError::query(format!("No unit can start at token {start}"))
            })?;
        }

        let mut units = Vec::new();
        let mut start = 0;
        while start < n {
            let k = best[start].1;
            units.push(if k == 1 {
                TokenUnit::single(tokens[start].clone())
            } else {
                TokenUnit::merged(&tokens[start..start + k])
            });
            start += k;
        }
        Ok(units)
    }
}

impl<S: Into<String>> FromIterator<S> for CommonTokens {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        CommonTokens {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tokens(text: &str) -> Vec<String> {
        text.split(' ').map(str::to_owned).collect()
    }

    fn common() -> CommonTokens {
        ["the", "is", "a", "of"].into_iter().collect()
    }

    #[test]
    fn test_window_end() {
        let common = common();
        assert_eq!(common.window_end(&tokens("cat dog")), 2);
        assert_eq!(common.window_end(&tokens("the cat")), 3);
        assert_eq!(common.window_end(&tokens("cat is")), 3);
        assert_eq!(common.window_end(&tokens("cat is a dog")), 4);
        assert_eq!(common.window_end(&tokens("the of a is")), 4);
        assert_eq!(common.window_end(&tokens("the")), 2);
        assert_eq!(CommonTokens::new().window_end(&tokens("the cat")), 2);
    }

    #[test]
    fn test_merged_units() {
        let units = common().merged_units(&tokens("the cat is a dog"));
        assert_eq!(
            units,
            vec![
                (0, "the cat".to_owned()),
                (1, "cat is".to_owned()),
                (1, "cat is a".to_owned()),
                (2, "is a".to_owned()),
                (2, "is a dog".to_owned()),
                (3, "a dog".to_owned()),
            ]
        );
        assert!(CommonTokens::new().merged_units(&tokens("the cat")).is_empty());
    }

    #[test]
    fn test_minimize_prefers_cheap_units() {
        let costs: AHashMap<&str, usize> = [
            ("the", 1000),
            ("cat", 40),
            ("the cat", 10),
            ("is", 900),
            ("cat is", 30),
            ("cat is a", 5),
            ("a", 800),
            ("is a", 200),
        ]
        .into_iter()
        .collect();

        let units = common()
            .minimize(&tokens("the cat is a"), |t| Ok(costs.get(t).copied()))
            .unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.token.as_str()).collect();
        assert_eq!(names, vec!["the cat", "is a"]);
        assert_eq!(units[1].len, 2);

        let cheap_the = |t: &str| Ok(if t == "the" { Some(100) } else { costs.get(t).copied() });
        let units = common().minimize(&tokens("the cat is a"), cheap_the).unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.token.as_str()).collect();
        assert_eq!(names, vec!["the", "cat is a"]);
        assert_eq!(units[1].len, 3);
    }

    #[test]
    fn test_minimize_missing_unit_wins() {
        let units = common()
            .minimize(&tokens("the cat"), |t| {
                Ok(match t {
                    "the cat" => None,
                    _ => Some(5),
                })
            })
            .unwrap();
        assert_eq!(units, vec![TokenUnit::merged(&tokens("the cat"))]);
    }

    #[test]
    fn test_minimize_without_common_tokens() {
        let units = CommonTokens::new()
            .minimize(&tokens("a b c"), |_| panic!("no lookups expected"))
            .unwrap();
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.len == 1));
    }

    #[test]
    fn test_select() {
        let freqs: AHashMap<String, u64> = [("the", 50), ("a", 40), ("cat", 3), ("dog", 2)]
            .into_iter()
            .map(|(t, f)| (t.to_owned(), f))
            .collect();

        let fixed = CommonTokens::select(&CommonTokensConfig::FixedNum(2), &freqs);
        assert!(fixed.contains("the") && fixed.contains("a") && !fixed.contains("cat"));

        let pct = CommonTokens::select(&CommonTokensConfig::Percentage(0.25), &freqs);
        assert_eq!(pct.len(), 1);
        assert!(pct.contains("the"));

        let list = CommonTokens::select(&CommonTokensConfig::List(vec!["dog".into()]), &freqs);
        assert!(list.contains("dog"));

        assert!(CommonTokens::select(&CommonTokensConfig::None, &freqs).is_empty());
    }

    #[test]
    fn test_persistence_and_truncation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("common_tokens.bin");

        let original = common();
        original.write_to(&path).unwrap();
        assert_eq!(CommonTokens::read_from(&path).unwrap(), original);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();
        let partial = CommonTokens::read_from(&path).unwrap();
        assert_eq!(partial.len(), 3);

        assert!(CommonTokens::read_from(&temp_dir.path().join("missing")).unwrap().is_empty());
    }
}
