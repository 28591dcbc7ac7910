//! Bounds-checked primitive reads, generic over ELF class and endianness.
//!
//! Every accessor returns `None` instead of reading past the buffer; the
//! input may be attacker-controlled or corrupted, so running off the end
//! must never be possible.

use super::{ElfClass, ElfData};

/// A cursor-free reader over the raw image.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    class: ElfClass,
    encoding: ElfData,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], class: ElfClass, encoding: ElfData) -> Self {
        Reader { data, class, encoding }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(offset..offset + 2)?.try_into().ok()?;
        Some(match self.encoding {
            ElfData::LittleEndian => u16::from_le_bytes(bytes),
            ElfData::BigEndian => u16::from_be_bytes(bytes),
        })
    }

    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self.encoding {
            ElfData::LittleEndian => u32::from_le_bytes(bytes),
            ElfData::BigEndian => u32::from_be_bytes(bytes),
        })
    }

    pub fn u64_at(&self, offset: usize) -> Option<u64> {
        let bytes: [u8; 8] = self.data.get(offset..offset + 8)?.try_into().ok()?;
        Some(match self.encoding {
            ElfData::LittleEndian => u64::from_le_bytes(bytes),
            ElfData::BigEndian => u64::from_be_bytes(bytes),
        })
    }

    /// A natural-width address/size field: `u32` on ELF32, `u64` on ELF64.
    pub fn addr_at(&self, offset: usize) -> Option<u64> {
        match self.class {
            ElfClass::Elf32 => self.u32_at(offset).map(u64::from),
            ElfClass::Elf64 => self.u64_at(offset),
        }
    }

    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// NUL-terminated string from a string table. An index at or beyond the
    /// table end resolves to the empty string rather than an error.
    pub fn string_at(&self, table_offset: u64, table_size: u64, index: u32) -> String {
        if u64::from(index) >= table_size {
            return String::new();
        }
        let start = table_offset.saturating_add(u64::from(index));
        let table_end = table_offset.saturating_add(table_size);
        let end = table_end.min(self.data.len() as u64);
        if start >= end {
            return String::new();
        }
        let slice = &self.data[start as usize..end as usize];
        let terminator = slice.iter().position(|byte| *byte == 0).unwrap_or(slice.len());
        String::from_utf8_lossy(&slice[..terminator]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness_is_respected() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let le = Reader::new(&data, ElfClass::Elf64, ElfData::LittleEndian);
        let be = Reader::new(&data, ElfClass::Elf64, ElfData::BigEndian);
        assert_eq!(le.u16_at(0), Some(0x0201));
        assert_eq!(be.u16_at(0), Some(0x0102));
        assert_eq!(le.u32_at(0), Some(0x0403_0201));
        assert_eq!(be.u32_at(0), Some(0x0102_0304));
        assert_eq!(le.u64_at(0), Some(0x0807_0605_0403_0201));
    }

    #[test]
    fn test_class_selects_address_width() {
        let data = [0xaa, 0, 0, 0, 0xbb, 0, 0, 0];
        let narrow = Reader::new(&data, ElfClass::Elf32, ElfData::LittleEndian);
        let wide = Reader::new(&data, ElfClass::Elf64, ElfData::LittleEndian);
        assert_eq!(narrow.addr_at(0), Some(0xaa));
        assert_eq!(wide.addr_at(0), Some(0x0000_00bb_0000_00aa));
    }

    #[test]
    fn test_reads_past_the_end_return_none() {
        let data = [0u8; 4];
        let reader = Reader::new(&data, ElfClass::Elf64, ElfData::LittleEndian);
        assert_eq!(reader.u32_at(1), None);
        assert_eq!(reader.u64_at(0), None);
        assert_eq!(reader.byte_at(4), None);
    }

    #[test]
    fn test_string_table_lookups() {
        let mut data = vec![0u8; 4];
        data.extend_from_slice(b"\0.text\0");
        let reader = Reader::new(&data, ElfClass::Elf64, ElfData::LittleEndian);
        assert_eq!(reader.string_at(4, 7, 1), ".text");
        assert_eq!(reader.string_at(4, 7, 0), "");
        // index beyond the table resolves to empty, not an error
        assert_eq!(reader.string_at(4, 7, 40), "");
        // unterminated tail stops at the table end
        assert_eq!(reader.string_at(4, 6, 1), ".text");
    }
}
