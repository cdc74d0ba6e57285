//! K-way merge of batch files into the final postings file and directory.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::Result;
use crate::indexer::batch::BatchReader;
use crate::packed::{self, count_doc_ids};
use crate::storage::structured::StructWriter;
use crate::storage::token_store::{TokenDirectory, TokenEntry};

/// Posting runs start on this byte boundary.
pub(crate) const RUN_ALIGNMENT: u64 = 64;

/// Summary of a finished merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeSummary {
    pub tokens: usize,
    pub bytes: u64,
}

/// Merge `batch_files` (in batch order) into `postings_path` and return the
/// directory describing it.
///
/// Segments of the same token are concatenated in batch order. When the
/// concatenation is not strictly ascending, because documents were added out
/// of id order across batches, it is sorted and OR-merged first.
pub(crate) fn merge_batches(
    batch_files: &[PathBuf],
    postings_path: &Path,
) -> Result<(TokenDirectory, MergeSummary)> {
    let mut readers = Vec::with_capacity(batch_files.len());
    for (index, path) in batch_files.iter().enumerate() {
        readers.push(BatchReader::open(path, index)?);
    }

    // Heads of every reader, ordered by (token, batch index).
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    let mut current: Vec<Option<Vec<u64>>> = vec![None; readers.len()];
    for reader in &mut readers {
        advance(reader, &mut heap, &mut current)?;
    }

    let mut writer = StructWriter::new(BufWriter::new(File::create(postings_path)?));
    let mut directory = TokenDirectory::new();
    let mut words: Vec<u64> = Vec::new();

    while let Some(Reverse((token, index))) = heap.pop() {
        words.clear();
        words.extend(current[index].take().unwrap_or_default());
        advance(&mut readers[index], &mut heap, &mut current)?;

        while let Some(Reverse((next, _))) = heap.peek() {
            if *next != token {
                break;
            }
            let Some(Reverse((_, index))) = heap.pop() else {
                break;
            };
            words.extend(current[index].take().unwrap_or_default());
            advance(&mut readers[index], &mut heap, &mut current)?;
        }

        packed::normalize(&mut words);

        writer.pad_to(RUN_ALIGNMENT)?;
        let begin = writer.position();
        writer.write_words(&words)?;
        directory.insert(
            token,
            TokenEntry {
                begin,
                length: (words.len() * size_of::<u64>()) as u64,
                doc_count: count_doc_ids(&words) as u32,
            },
        );
    }

    let summary = MergeSummary {
        tokens: directory.len(),
        bytes: writer.position(),
    };
    writer.finish()?;
    info!(
        "Merged {} batch files: {} tokens, {} bytes",
        batch_files.len(),
        summary.tokens,
        summary.bytes
    );
    Ok((directory, summary))
}

fn advance(
    reader: &mut BatchReader,
    heap: &mut BinaryHeap<Reverse<(String, usize)>>,
    current: &mut [Option<Vec<u64>>],
) -> Result<()> {
    match reader.next_entry()? {
        Some((token, words)) => {
            current[reader.index()] = Some(words);
            heap.push(Reverse((token, reader.index())));
        }
        None => debug!("Batch {} exhausted", reader.index()),
    }
    Ok(())
}
