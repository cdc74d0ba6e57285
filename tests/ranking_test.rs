//! Integration tests for BM25 ranking and scored queries.

use roaringish::prelude::*;
use tempfile::TempDir;

fn build_index(docs: &[&str]) -> Result<(TempDir, Searcher)> {
    let temp_dir = TempDir::new().unwrap();
    let mut indexer = Indexer::with_defaults(temp_dir.path())?;
    indexer.index(docs.iter().zip(0u32..))?;
    let searcher = Searcher::with_defaults(temp_dir.path())?;
    Ok((temp_dir, searcher))
}

#[test]
fn test_bm25_order() -> Result<()> {
    let (_dir, searcher) = build_index(&["apple banana", "apple banana cherry", "apple"])?;

    let hits = searcher.search_bm25("apple banana", 10)?;
    let docs: Vec<u32> = hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(docs, vec![0, 1, 2]);
    assert!(hits[0].score > hits[1].score);
    assert!(hits[1].score > hits[2].score);

    let top = searcher.search_bm25("apple banana", 1)?;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].doc_id, 0);

    assert!(searcher.search_bm25("durian", 10)?.is_empty());
    assert!(searcher.search_bm25("", 10)?.is_empty());

    Ok(())
}

#[test]
fn test_term_frequency_raises_score() -> Result<()> {
    let (_dir, searcher) = build_index(&["cat dog", "cat cat", "dog dog"])?;

    let hits = searcher.search_query(&TermQuery::new("cat").into(), 10)?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].doc_id, 1);
    assert!(hits[0].score > hits[1].score);

    Ok(())
}

#[test]
fn test_boolean_query_scoring() -> Result<()> {
    let (_dir, searcher) = build_index(&["red fox", "red fox runs", "blue fox", "red car"])?;

    let query: Query = BooleanQuery::new()
        .must(TermQuery::new("fox").into())
        .should(TermQuery::new("red").into())
        .must_not(TermQuery::new("runs").into())
        .into();
    let hits = searcher.search_query(&query, 10)?;
    let docs: Vec<u32> = hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(docs, vec![0, 2]);

    let phrase: Query = PhraseQuery::new(["red", "fox"]).into();
    let docs: Vec<u32> = searcher
        .search_query(&phrase, 10)?
        .iter()
        .map(|hit| hit.doc_id)
        .collect();
    assert_eq!(docs, vec![0, 1]);

    let only_excluded: Query = BooleanQuery::new()
        .must_not(TermQuery::new("red").into())
        .into();
    assert!(searcher.search_query(&only_excluded, 10)?.is_empty());

    let missing_required: Query = BooleanQuery::new()
        .must(TermQuery::new("fox").into())
        .must(TermQuery::new("zebra").into())
        .into();
    assert!(searcher.search_query(&missing_required, 10)?.is_empty());

    let all = searcher.search_query(&Query::MatchAll, 10)?;
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|hit| hit.score == 1.0));

    Ok(())
}

#[test]
fn test_equal_scores_ordered_by_doc_id() -> Result<()> {
    let (_dir, searcher) = build_index(&["same text", "other", "same text", "same text"])?;

    let docs: Vec<u32> = searcher
        .search_bm25("same", 2)?
        .iter()
        .map(|hit| hit.doc_id)
        .collect();
    assert_eq!(docs, vec![0, 2]);

    Ok(())
}
