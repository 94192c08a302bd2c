// Thu Oct 15 2026 - Alex

use crate::engine::CancelToken;
use crate::image::BinaryImage;
use crate::pattern::{Pattern, ScanError};
use ahash::AHashMap;
use aho_corasick::AhoCorasick;
use rayon::prelude::*;

const DEFAULT_CHUNK_SIZE: usize = 0x10000;

/// A verified pattern hit. `offset` is a file offset and the whole
/// pattern lies inside `section_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawMatch {
    pub pattern_index: usize,
    pub offset: usize,
    pub section_index: usize,
}

#[derive(Debug, Clone, Copy)]
struct AnchorRef {
    pattern_index: usize,
    anchor_offset: usize,
}

/// Every pattern of a catalog folded into one Aho-Corasick automaton.
///
/// Each pattern contributes its longest literal run as an anchor. The
/// automaton walks a section once, and every anchor hit is verified
/// against the full masked pattern, so a scan costs
/// `O(section + hits)` regardless of how many patterns are loaded.
pub struct PatternSet {
    patterns: Vec<Pattern>,
    automaton: Option<AhoCorasick>,
    anchors: Vec<Vec<AnchorRef>>,
    max_anchor_len: usize,
    chunk_size: usize,
}

impl PatternSet {
    pub fn compile(patterns: Vec<Pattern>) -> Result<Self, ScanError> {
        let mut unique: AHashMap<Vec<u8>, usize> = AHashMap::new();
        let mut literals: Vec<Vec<u8>> = Vec::new();
        let mut anchors: Vec<Vec<AnchorRef>> = Vec::new();

        for (pattern_index, pattern) in patterns.iter().enumerate() {
            let (anchor_offset, literal) = pattern.anchor()
                .ok_or(ScanError::NoAnchor(pattern_index))?;

            let id = match unique.get(literal) {
                Some(&id) => id,
                None => {
                    literals.push(literal.to_vec());
                    anchors.push(Vec::new());
                    unique.insert(literal.to_vec(), literals.len() - 1);
                    literals.len() - 1
                }
            };
            anchors[id].push(AnchorRef { pattern_index, anchor_offset });
        }

        let max_anchor_len = literals.iter().map(|l| l.len()).max().unwrap_or(0);

        let automaton = if literals.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&literals)
                .map_err(|e| ScanError::Automaton(e.to_string()))?)
        };

        log::debug!(
            "Compiled {} patterns into {} distinct anchors",
            patterns.len(),
            literals.len()
        );

        Ok(Self {
            patterns,
            automaton,
            anchors,
            max_anchor_len,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Scans every section of `image` and returns the matches sorted by
    /// `(pattern_index, offset)`. A file offset covered by overlapping
    /// sections is reported once, for the first section in image order.
    pub fn scan(&self, image: &BinaryImage, cancel: &CancelToken) -> Result<Vec<RawMatch>, ScanError> {
        let Some(automaton) = &self.automaton else {
            return Ok(Vec::new());
        };

        let per_section: Vec<Result<Vec<RawMatch>, ScanError>> = image.sections()
            .par_iter()
            .enumerate()
            .map(|(section_index, _)| self.scan_section(automaton, image, section_index, cancel))
            .collect();

        let mut matches = Vec::new();
        for section_matches in per_section {
            matches.extend(section_matches?);
        }

        // Sections are in image order, so after sorting the first of any
        // duplicate (pattern, offset) pair carries the earliest section.
        matches.sort_unstable();
        matches.dedup_by_key(|m| (m.pattern_index, m.offset));
        Ok(matches)
    }

    fn scan_section(
        &self,
        automaton: &AhoCorasick,
        image: &BinaryImage,
        section_index: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<RawMatch>, ScanError> {
        let section = &image.sections()[section_index];
        let data = image.data();
        let mut matches = Vec::new();
        let mut chunk_start = section.start;

        while chunk_start < section.end {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            // The window runs past the chunk so anchors starting near its end are
            // still seen whole; hits starting past the chunk belong to the next one.
            let chunk_end = chunk_start.saturating_add(self.chunk_size).min(section.end);
            let window_end = chunk_end
                .saturating_add(self.max_anchor_len.saturating_sub(1))
                .min(section.end);
            let window = &data[chunk_start..window_end];

            for hit in automaton.find_overlapping_iter(window) {
                let hit_start = chunk_start + hit.start();
                if hit_start >= chunk_end {
                    continue;
                }

                for anchor in &self.anchors[hit.pattern().as_usize()] {
                    let Some(start) = hit_start.checked_sub(anchor.anchor_offset) else {
                        continue;
                    };
                    if start < section.start {
                        continue;
                    }

                    let pattern = &self.patterns[anchor.pattern_index];
                    let Some(end) = start.checked_add(pattern.len()) else {
                        continue;
                    };
                    if end > section.end {
                        continue;
                    }

                    if pattern.matches(&data[start..end]) {
                        matches.push(RawMatch {
                            pattern_index: anchor.pattern_index,
                            offset: start,
                            section_index,
                        });
                    }
                }
            }

            chunk_start = chunk_end;
        }

        Ok(matches)
    }
}
