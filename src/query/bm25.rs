//! BM25 term weighting.

/// Term frequency saturation.
pub const K1: f32 = 1.2;

/// Document length normalization.
pub const B: f32 = 0.75;

/// BM25 weight of one term (or phrase) over an index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25 {
    idf: f32,
    avg_doc_length: f32,
}

impl Bm25 {
    /// Weight for a term occurring in `doc_freq` of `total_docs` documents.
    pub fn new(total_docs: u32, doc_freq: u32, avg_doc_length: f32) -> Self {
        Bm25 {
            idf: idf(total_docs, doc_freq),
            avg_doc_length,
        }
    }

    pub fn idf(&self) -> f32 {
        self.idf
    }

    /// Score of a document with `term_freq` occurrences and `doc_length`
    /// tokens.
    pub fn score(&self, term_freq: u32, doc_length: u32) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }
        let tf = term_freq as f32;
        let length_ratio = if self.avg_doc_length > 0.0 {
            doc_length as f32 / self.avg_doc_length
        } else {
            1.0
        };
        let norm = 1.0 - B + B * length_ratio;
        self.idf * (tf * (K1 + 1.0)) / (tf + K1 * norm)
    }
}

/// `ln(1 + (N - df + 0.5) / (df + 0.5))`, never negative.
pub fn idf(total_docs: u32, doc_freq: u32) -> f32 {
    let n = total_docs as f32;
    let df = doc_freq as f32;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln().max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf() {
        assert!((idf(3, 3) - (1.0f32 + 0.5 / 3.5).ln()).abs() < 1e-6);
        assert!(idf(10, 1) > idf(10, 5));
        assert!(idf(0, 5) >= 0.0);
    }

    #[test]
    fn test_score_prefers_short_documents() {
        let bm25 = Bm25::new(3, 2, 2.0);
        assert!(bm25.score(1, 2) > bm25.score(1, 3));
        assert!(bm25.score(2, 3) > bm25.score(1, 3));
        assert_eq!(bm25.score(0, 3), 0.0);
    }

    #[test]
    fn test_zero_average_length() {
        let bm25 = Bm25::new(1, 1, 0.0);
        assert!(bm25.score(1, 0).is_finite());
    }
}
