//! Term dictionaries and positional posting lists.
//!
//! Per indexed field a segment holds:
//! - `<field>.dict` - count, then sorted `[len u16, term, offset u64, length u32, doc_freq u32]`
//! - `<field>.postings` - per document `[doc delta, tf, tf position deltas]` as varints

use crate::error::{Error, Result};
use crate::index::types::DocId;
use crate::utils::{
    VarintCursor, delta_encode, encode_varint, read_u16_le, read_u32_le, read_u64_le,
    write_u16_le, write_u32_le, write_u64_le,
};
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::Deref;
use std::path::Path;

/// One document's occurrences of a term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc: DocId,
    pub positions: Vec<u32>,
}

impl Posting {
    #[inline]
    pub fn term_freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Append postings (sorted by doc) to `buf`
pub fn encode_postings(postings: &[Posting], buf: &mut Vec<u8>) {
    let mut prev_doc = 0;
    for posting in postings {
        encode_varint(posting.doc - prev_doc, buf);
        encode_varint(posting.term_freq(), buf);
        delta_encode(&posting.positions, buf);
        prev_doc = posting.doc;
    }
}

/// Decode a posting list written by [`encode_postings`]
pub fn decode_postings(buf: &[u8]) -> Result<Vec<Posting>> {
    let truncated = || Error::Corruption("truncated posting list".into());
    let mut cursor = VarintCursor::new(buf);
    let mut postings = Vec::new();
    let mut doc = 0u32;

    while !cursor.is_empty() {
        doc = doc.saturating_add(cursor.next_u32().ok_or_else(truncated)?);
        let tf = cursor.next_u32().ok_or_else(truncated)?;
        let mut positions = Vec::with_capacity(tf as usize);
        let mut pos = 0u32;
        for _ in 0..tf {
            pos = pos.saturating_add(cursor.next_u32().ok_or_else(truncated)?);
            positions.push(pos);
        }
        postings.push(Posting { doc, positions });
    }

    Ok(postings)
}

/// Dictionary entry mapping a term to its postings
#[derive(Debug, Clone)]
pub struct TermDictEntry {
    pub term: String,
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
}

/// Sorted term dictionary of one field in one segment
#[derive(Debug, Default)]
pub struct TermDict {
    entries: Vec<TermDictEntry>,
}

impl TermDict {
    pub fn lookup(&self, term: &str) -> Option<&TermDictEntry> {
        self.entries
            .binary_search_by(|e| e.term.as_str().cmp(term))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// All entries whose term starts with `prefix`
    pub fn prefix_range(&self, prefix: &str) -> &[TermDictEntry] {
        let start = self.entries.partition_point(|e| e.term.as_str() < prefix);
        let len = self.entries[start..]
            .iter()
            .take_while(|e| e.term.starts_with(prefix))
            .count();
        &self.entries[start..start + len]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TermDictEntry] {
        &self.entries
    }
}

/// Write a field's dictionary and postings files
pub fn write_field_index(
    dict_path: &Path,
    postings_path: &Path,
    terms: &BTreeMap<String, Vec<Posting>>,
) -> Result<()> {
    let mut dict_file = BufWriter::new(File::create(dict_path)?);
    let mut postings_file = BufWriter::new(File::create(postings_path)?);

    write_u32_le(&mut dict_file, terms.len() as u32)?;

    let mut postings_offset: u64 = 0;
    let mut encoded = Vec::new();

    for (term, postings) in terms {
        encoded.clear();
        encode_postings(postings, &mut encoded);

        let term_bytes = term.as_bytes();
        write_u16_le(&mut dict_file, term_bytes.len() as u16)?;
        dict_file.write_all(term_bytes)?;
        write_u64_le(&mut dict_file, postings_offset)?;
        write_u32_le(&mut dict_file, encoded.len() as u32)?;
        write_u32_le(&mut dict_file, postings.len() as u32)?;

        postings_file.write_all(&encoded)?;
        postings_offset += encoded.len() as u64;
    }

    dict_file.flush()?;
    postings_file.flush()?;
    Ok(())
}

/// Read a term dictionary written by [`write_field_index`]
pub fn read_term_dict(dict_path: &Path) -> Result<TermDict> {
    let mut file = BufReader::new(File::open(dict_path)?);

    let count = read_u32_le(&mut file)? as usize;
    let mut entries = Vec::with_capacity(count);

    for _ in 0..count {
        let term_len = read_u16_le(&mut file)? as usize;
        let mut term_bytes = vec![0u8; term_len];
        std::io::Read::read_exact(&mut file, &mut term_bytes)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| Error::Corruption(format!("non UTF-8 term in {}", dict_path.display())))?;

        let offset = read_u64_le(&mut file)?;
        let length = read_u32_le(&mut file)?;
        let doc_freq = read_u32_le(&mut file)?;

        entries.push(TermDictEntry {
            term,
            offset,
            length,
            doc_freq,
        });
    }

    // Already sorted: written from a BTreeMap
    Ok(TermDict { entries })
}

/// Read-only file contents, memory mapped when non-empty
pub enum FileData {
    Mapped(Mmap),
    Empty,
}

impl FileData {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(FileData::Empty);
        }
        // SAFETY: segment files are immutable once meta.json references them
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(FileData::Mapped(mmap))
    }

    /// Byte range of a dictionary entry, checked against the file length
    pub fn slice(&self, offset: u64, length: u32) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start + length as usize;
        self.get(start..end)
            .ok_or_else(|| Error::Corruption(format!("range {start}..{end} past end of file")))
    }
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mapped(mmap) => mmap,
            FileData::Empty => &[],
        }
    }
}
