// Thu Oct 15 2026 - Alex

use crate::image::{ImageError, ModuleFile};
use bytes::Bytes;
use goblin::mach::Mach;
use goblin::Object;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest buffer we attempt to analyze: enough for a format magic.
pub const MIN_IMAGE_LEN: usize = 4;

/// A half-open `[start, end)` range of file offsets. An empty name marks
/// the synthetic section used when the format is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Section {
    pub fn new(name: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn whole(len: usize) -> Self {
        Self::new("", 0, len)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_unnamed(&self) -> bool {
        self.name.is_empty()
    }

    /// Name for display; the synthetic section reads as `<image>`.
    pub fn label(&self) -> &str {
        if self.is_unnamed() { "<image>" } else { &self.name }
    }

    pub fn contains(&self, offset: usize, len: usize) -> bool {
        offset >= self.start && offset.checked_add(len).map_or(false, |end| end <= self.end)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [0x{:x}-0x{:x})", self.label(), self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Elf,
    Pe,
    MachO,
    /// Layout supplied by the caller rather than parsed.
    Custom,
    Raw,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Elf => "ELF",
            ImageFormat::Pe => "PE",
            ImageFormat::MachO => "Mach-O",
            ImageFormat::Custom => "custom",
            ImageFormat::Raw => "raw",
        }
    }
}

/// The bytes of one uploaded module plus the file ranges of its sections.
/// Never mutated after construction.
#[derive(Debug, Clone)]
pub struct BinaryImage {
    data: Bytes,
    format: ImageFormat,
    sections: Vec<Section>,
}

impl BinaryImage {
    pub fn load(file: &ModuleFile, data: Bytes) -> Result<Self, ImageError> {
        let image = Self::from_bytes(data)?;
        log::debug!(
            "Loaded {} ({} bytes) as {} with {} sections",
            file.filename(),
            image.len(),
            image.format.as_str(),
            image.sections.len()
        );
        Ok(image)
    }

    /// Parses the section table when the format is recognized. Anything
    /// else becomes a single unnamed section spanning the buffer.
    pub fn from_bytes(data: Bytes) -> Result<Self, ImageError> {
        check_len(&data)?;

        let (format, sections) = match detect_sections(&data) {
            Some((format, sections)) if !sections.is_empty() => (format, sections),
            _ => (ImageFormat::Raw, vec![Section::whole(data.len())]),
        };

        Ok(Self {
            format,
            sections: normalize(sections),
            data,
        })
    }

    /// Builds an image from a known layout. Sections must lie inside the
    /// buffer; empty ones are dropped.
    pub fn with_sections(data: Bytes, sections: Vec<Section>) -> Result<Self, ImageError> {
        check_len(&data)?;

        for section in &sections {
            if section.start > section.end || section.end > data.len() {
                return Err(ImageError::SectionOutOfBounds {
                    name: section.name.clone(),
                    start: section.start,
                    end: section.end,
                    len: data.len(),
                });
            }
        }

        let format = if sections.iter().all(Section::is_unnamed) {
            ImageFormat::Raw
        } else {
            ImageFormat::Custom
        };

        Ok(Self {
            format,
            sections: normalize(sections),
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn is_structured(&self) -> bool {
        self.sections.iter().any(|s| !s.is_unnamed())
    }
}

fn check_len(data: &[u8]) -> Result<(), ImageError> {
    if data.len() < MIN_IMAGE_LEN {
        return Err(ImageError::Truncated {
            len: data.len(),
            min: MIN_IMAGE_LEN,
        });
    }
    Ok(())
}

fn normalize(mut sections: Vec<Section>) -> Vec<Section> {
    sections.retain(|s| !s.is_empty());
    sections.sort_by(|a, b| (a.start, a.end, &a.name).cmp(&(b.start, b.end, &b.name)));
    sections.dedup();
    sections
}

/// Clamps a header-declared range to the buffer. Headers of hostile files
/// can point anywhere, so out of range offsets are dropped, not trusted.
fn clamp_range(name: &str, offset: u64, size: u64, len: usize) -> Option<Section> {
    let start = usize::try_from(offset).ok()?;
    let size = usize::try_from(size).unwrap_or(usize::MAX);
    let end = start.saturating_add(size).min(len);
    if start >= end {
        return None;
    }
    Some(Section::new(name, start, end))
}

fn detect_sections(data: &[u8]) -> Option<(ImageFormat, Vec<Section>)> {
    let object = match Object::parse(data) {
        Ok(object) => object,
        Err(e) => {
            log::debug!("No recognizable object format: {}", e);
            return None;
        }
    };

    match object {
        Object::Elf(elf) => {
            use goblin::elf::section_header::{SHT_NOBITS, SHT_NULL};

            let sections = elf.section_headers.iter()
                .filter(|sh| sh.sh_type != SHT_NOBITS && sh.sh_type != SHT_NULL)
                .filter_map(|sh| {
                    let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("");
                    clamp_range(name, sh.sh_offset, sh.sh_size, data.len())
                })
                .collect();
            Some((ImageFormat::Elf, sections))
        }
        Object::PE(pe) => {
            let sections = pe.sections.iter()
                .filter_map(|section| {
                    let name = section.name().unwrap_or("");
                    clamp_range(
                        name,
                        section.pointer_to_raw_data as u64,
                        section.size_of_raw_data as u64,
                        data.len(),
                    )
                })
                .collect();
            Some((ImageFormat::Pe, sections))
        }
        Object::Mach(Mach::Binary(macho)) => {
            let mut sections = Vec::new();
            for segment in macho.segments.iter() {
                let Ok(segment_sections) = segment.sections() else {
                    continue;
                };
                for (section, _data) in segment_sections {
                    // Zero-fill sections have no file bytes.
                    if section.offset == 0 {
                        continue;
                    }
                    let sectname = std::str::from_utf8(&section.sectname)
                        .unwrap_or("")
                        .trim_end_matches('\0');
                    if let Some(s) = clamp_range(sectname, section.offset as u64, section.size, data.len()) {
                        sections.push(s);
                    }
                }
            }
            Some((ImageFormat::MachO, sections))
        }
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_format_is_single_section() {
        let mut data = vec![0x7f, b'E', b'L', b'F', 1, 1, 1, 0];
        data.extend_from_slice(&[0u8; 100]);
        data.extend_from_slice(b"discord_voice");
        let len = data.len();

        let image = BinaryImage::from_bytes(Bytes::from(data)).unwrap();
        assert_eq!(image.format(), ImageFormat::Raw);
        assert_eq!(image.sections(), &[Section::whole(len)]);
        assert!(!image.is_structured());
    }

    #[test]
    fn test_random_bytes_do_not_fail() {
        let data: Vec<u8> = (0..400u32).map(|i| (i % 4) as u8).collect();
        let image = BinaryImage::from_bytes(Bytes::from(data)).unwrap();
        assert_eq!(image.sections().len(), 1);
    }

    #[test]
    fn test_truncated_buffer() {
        assert_eq!(
            BinaryImage::from_bytes(Bytes::from_static(b"MZ")).unwrap_err(),
            ImageError::Truncated { len: 2, min: MIN_IMAGE_LEN }
        );
        assert!(BinaryImage::from_bytes(Bytes::new()).is_err());
    }

    #[test]
    fn test_parses_elf_sections() {
        let text = [0x55, 0x48, 0x89, 0xE5, 0xC3];
        let image = BinaryImage::from_bytes(Bytes::from(fixtures::minimal_elf(&text))).unwrap();

        assert_eq!(image.format(), ImageFormat::Elf);
        let text_section = image.sections().iter().find(|s| s.name == ".text").unwrap();
        assert_eq!(text_section.start, 0x40);
        assert_eq!(text_section.end, 0x40 + text.len());
        assert_eq!(&image.data()[text_section.start..text_section.end], &text);
        assert!(image.sections().iter().any(|s| s.name == ".shstrtab"));
    }

    #[test]
    fn test_parses_pe_sections() {
        let text = [0x48, 0x89, 0x5C, 0x24, 0x08, 0xC3];
        let data = fixtures::minimal_pe(&text);
        let len = data.len();
        let image = BinaryImage::from_bytes(Bytes::from(data)).unwrap();

        assert_eq!(image.format(), ImageFormat::Pe);
        let names: Vec<_> = image.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![".text", ".rdata"]);

        let text_section = &image.sections()[0];
        assert_eq!(text_section.start, 0x200);
        assert_eq!(&image.data()[text_section.start..text_section.end], &text);

        // Declared far past the end of the file, cut back to the buffer.
        let rdata = &image.sections()[1];
        assert_eq!(rdata.start, 0x200 + text.len());
        assert_eq!(rdata.end, len);
    }

    #[test]
    fn test_parses_macho_sections() {
        let text = [0x55, 0x48, 0x89, 0xE5, 0x5D, 0xC3];
        let image = BinaryImage::from_bytes(Bytes::from(fixtures::minimal_macho(&text))).unwrap();

        assert_eq!(image.format(), ImageFormat::MachO);
        assert_eq!(image.sections().len(), 1);
        let text_section = &image.sections()[0];
        assert_eq!(text_section.name, "__text");
        assert_eq!(text_section.start, 0x110);
        assert_eq!(&image.data()[text_section.start..text_section.end], &text);
        assert!(image.sections().iter().all(|s| s.name != "__bss"));
    }

    #[test]
    fn test_elf_section_size_past_eof_is_clamped() {
        let mut data = fixtures::minimal_elf(&[0x90; 32]);
        fixtures::patch_elf_text_header(&mut data, 0x40, 0xFFFF_FFFF_0000);
        let len = data.len();

        let image = BinaryImage::from_bytes(Bytes::from(data)).unwrap();
        assert_eq!(image.format(), ImageFormat::Elf);
        let text_section = image.sections().iter().find(|s| s.name == ".text").unwrap();
        assert_eq!(text_section.start, 0x40);
        assert_eq!(text_section.end, len);
    }

    #[test]
    fn test_elf_section_offset_past_eof_is_dropped() {
        let mut data = fixtures::minimal_elf(&[0x90; 32]);
        fixtures::patch_elf_text_header(&mut data, 0x10_0000, 32);

        let image = BinaryImage::from_bytes(Bytes::from(data)).unwrap();
        assert_eq!(image.format(), ImageFormat::Elf);
        assert!(image.sections().iter().all(|s| s.name != ".text"));
        assert!(image.sections().iter().any(|s| s.name == ".shstrtab"));
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(".a", 4, 8, 100), Some(Section::new(".a", 4, 12)));
        assert_eq!(clamp_range(".a", 96, 8, 100), Some(Section::new(".a", 96, 100)));
        assert_eq!(clamp_range(".a", 100, 8, 100), None);
        assert_eq!(clamp_range(".a", u64::MAX, u64::MAX, 100), None);
        assert_eq!(clamp_range(".a", 4, 0, 100), None);
    }

    #[test]
    fn test_with_sections_validates_bounds() {
        let data = Bytes::from(vec![0u8; 16]);
        assert!(matches!(
            BinaryImage::with_sections(data.clone(), vec![Section::new(".text", 8, 32)]),
            Err(ImageError::SectionOutOfBounds { .. })
        ));

        let image = BinaryImage::with_sections(
            data,
            vec![Section::new(".data", 8, 16), Section::new(".text", 0, 8), Section::new(".bss", 16, 16)],
        )
        .unwrap();
        let names: Vec<_> = image.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![".text", ".data"]);
    }

    #[test]
    fn test_section_contains() {
        let section = Section::new(".text", 10, 20);
        assert!(section.contains(10, 10));
        assert!(!section.contains(11, 10));
        assert!(!section.contains(9, 2));
        assert!(!section.contains(usize::MAX, 2));
    }
}
