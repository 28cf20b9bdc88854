use crate::error::Result;
use crate::index::reader::SegmentReader;
use crate::index::segment::SegmentBuilder;
use crate::index::types::SegmentMeta;
use crate::utils::AnalyzerKind;
use std::path::Path;

/// Rewrite the live documents of `segments` into a single new segment at
/// `dest`. Stored fields are re-analyzed, so deleted docs and their terms
/// disappear from the result.
///
/// Returns the new segment's doc count, or `None` if nothing is live and no
/// segment was written.
pub fn merge_segments<'a>(
    segments: impl IntoIterator<Item = &'a SegmentReader>,
    analyzer: AnalyzerKind,
    dest: &Path,
) -> Result<Option<u32>> {
    let mut builder = SegmentBuilder::new(analyzer);

    for segment in segments {
        for doc in segment.live_docs() {
            builder.add(segment.stored(doc)?);
        }
    }

    if builder.is_empty() {
        return Ok(None);
    }

    Ok(Some(builder.write(dest)?))
}

/// Pick the segments a commit should merge so that at most `max_segments`
/// remain, or nothing if the count is already within bounds.
///
/// Starts from the smallest segments and keeps absorbing the next smallest
/// while it holds at most twice the live docs gathered so far. Segment
/// sizes then grow geometrically, so each document is rewritten a
/// logarithmic number of times.
pub fn select_merge(segments: &[SegmentMeta], max_segments: usize) -> Vec<usize> {
    let max_segments = max_segments.max(1);
    if segments.len() <= max_segments {
        return Vec::new();
    }

    let mut by_size: Vec<usize> = (0..segments.len()).collect();
    by_size.sort_by_key(|&ord| (segments[ord].live_docs(), segments[ord].id));

    let mut take = (segments.len() - max_segments + 1).max(2);
    let mut gathered: u64 = by_size[..take]
        .iter()
        .map(|&ord| u64::from(segments[ord].live_docs()))
        .sum();
    while let Some(&next) = by_size.get(take) {
        let size = u64::from(segments[next].live_docs());
        if size > gathered * 2 {
            break;
        }
        gathered += size;
        take += 1;
    }

    let mut chosen = by_size[..take].to_vec();
    chosen.sort_unstable();
    chosen
}
