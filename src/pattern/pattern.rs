// Thu Oct 15 2026 - Alex

use crate::pattern::PatternError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, mask: Vec<bool>) -> Result<Self, PatternError> {
        if bytes.len() != mask.len() {
            return Err(PatternError::LengthMismatch {
                bytes: bytes.len(),
                mask: mask.len(),
            });
        }
        Ok(Self { bytes, mask })
    }

    /// Parses an IDA-style signature such as `48 8B ?? 74 ?`.
    /// Every token must be a one or two digit hex byte or a `?`/`??` wildcard.
    pub fn from_ida_pattern(pattern: &str) -> Result<Self, PatternError> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in pattern.split_whitespace() {
            match token {
                "?" | "??" => {
                    bytes.push(0);
                    mask.push(false);
                }
                _ => {
                    if token.len() > 2 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(PatternError::InvalidByte(token.to_string()));
                    }
                    let byte = u8::from_str_radix(token, 16)
                        .map_err(|_| PatternError::InvalidByte(token.to_string()))?;
                    bytes.push(byte);
                    mask.push(true);
                }
            }
        }

        Ok(Self { bytes, mask })
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            mask: vec![true; bytes.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.bytes.len() {
            return false;
        }

        self.bytes.iter()
            .zip(self.mask.iter())
            .zip(data.iter())
            .all(|((pattern_byte, &significant), &data_byte)| {
                !significant || *pattern_byte == data_byte
            })
    }

    /// Reference scan used to cross-check the automaton.
    pub fn find_all_in(&self, data: &[u8]) -> Vec<usize> {
        if self.bytes.is_empty() || data.len() < self.bytes.len() {
            return Vec::new();
        }

        (0..=(data.len() - self.bytes.len()))
            .filter(|&i| self.matches(&data[i..]))
            .collect()
    }

    pub fn significant_byte_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn wildcard_byte_count(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }

    pub fn is_all_wildcards(&self) -> bool {
        self.significant_byte_count() == 0
    }

    pub fn specificity(&self) -> f64 {
        if self.bytes.is_empty() {
            return 0.0;
        }
        self.significant_byte_count() as f64 / self.bytes.len() as f64
    }

    /// Longest run of fixed bytes, returned as `(offset, bytes)`.
    /// The earliest run wins on equal length.
    pub fn anchor(&self) -> Option<(usize, &[u8])> {
        let mut best: Option<(usize, usize)> = None;
        let mut run_start = None;

        for i in 0..=self.mask.len() {
            let significant = i < self.mask.len() && self.mask[i];
            match (significant, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    let len = i - start;
                    if best.map_or(true, |(_, best_len)| len > best_len) {
                        best = Some((start, len));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }

        best.map(|(start, len)| (start, &self.bytes[start..start + len]))
    }

    pub fn to_hex_string(&self) -> String {
        self.bytes.iter()
            .zip(self.mask.iter())
            .map(|(b, &m)| {
                if m {
                    format!("{:02X}", b)
                } else {
                    "??".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}
