//! ELF parsing for already-compiled programs.
//!
//! The parser is read-only and deliberately lenient: it accepts ELF32 and
//! ELF64 in either endianness, and a table entry that would read past the
//! buffer ends that table instead of failing the parse. Only a broken
//! identification block is a hard error. Domain-specific expectations
//! (a `.text` section, an entry symbol) are advisory findings from
//! [`validate_bpf_elf`], not parse failures.

pub mod reader;

use reader::Reader;

/// Word width from `EI_CLASS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

/// Byte order from `EI_DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    LittleEndian,
    BigEndian,
}

/// Errors for input that is not an ELF image at all.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ElfError {
    /// Shorter than one full ELF64 header
    #[error("ELF image too short: {0} bytes")]
    TooShort(usize),

    /// Bad magic, class, data encoding, or version
    #[error("invalid ELF header")]
    InvalidHeader,
}

/// One program (segment) header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

/// One section header, name already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
}

/// One symbol-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u64,
    pub size: u64,
    /// Low nibble of the info byte
    pub sym_type: u8,
    /// High nibble of the info byte
    pub binding: u8,
}

/// Everything a parse produces. Owned entirely by the caller; nothing is
/// shared with the input buffer.
#[derive(Debug, Clone)]
pub struct ElfBinary {
    pub class: ElfClass,
    pub encoding: ElfData,
    pub entry: u64,
    pub program_headers: Vec<ProgramHeader>,
    pub section_headers: Vec<SectionHeader>,
    pub symbols: Vec<Symbol>,
}

impl ElfBinary {
    /// Find a section by name.
    pub fn find_section(&self, name: &str) -> Option<&SectionHeader> {
        self.section_headers.iter().find(|section| section.name == name)
    }

    /// The file bytes a section covers, bounds-clamped against the image.
    pub fn section_payload<'a>(&self, name: &str, image: &'a [u8]) -> Option<&'a [u8]> {
        let section = self.find_section(name)?;
        let start = usize::try_from(section.offset).ok()?;
        if start >= image.len() {
            return None;
        }
        let end = start
            .checked_add(usize::try_from(section.size).ok()?)?
            .min(image.len());
        Some(&image[start..end])
    }
}

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

const SHT_SYMTAB: u32 = 2;
const SHT_DYNSYM: u32 = 11;

/// Parse an ELF image into headers, sections, and symbols.
pub fn parse(bytes: &[u8]) -> Result<ElfBinary, ElfError> {
    if bytes.len() < 64 {
        return Err(ElfError::TooShort(bytes.len()));
    }
    if bytes[..4] != ELF_MAGIC {
        return Err(ElfError::InvalidHeader);
    }
    let class = match bytes[4] {
        1 => ElfClass::Elf32,
        2 => ElfClass::Elf64,
        _ => return Err(ElfError::InvalidHeader),
    };
    let encoding = match bytes[5] {
        1 => ElfData::LittleEndian,
        2 => ElfData::BigEndian,
        _ => return Err(ElfError::InvalidHeader),
    };
    if bytes[6] != 1 {
        return Err(ElfError::InvalidHeader);
    }

    let reader = Reader::new(bytes, class, encoding);
    let header = HeaderLayout::for_class(class);

    let entry = reader.addr_at(24).unwrap_or(0);
    let ph_offset = reader.addr_at(header.phoff).unwrap_or(0);
    let ph_entry_size = reader.u16_at(header.phentsize).unwrap_or(0) as usize;
    let ph_count = reader.u16_at(header.phnum).unwrap_or(0) as usize;
    let sh_offset = reader.addr_at(header.shoff).unwrap_or(0);
    let sh_entry_size = reader.u16_at(header.shentsize).unwrap_or(0) as usize;
    let sh_count = reader.u16_at(header.shnum).unwrap_or(0) as usize;
    let shstrndx = reader.u16_at(header.shstrndx).unwrap_or(0) as usize;

    let program_headers = parse_program_headers(&reader, class, ph_offset, ph_entry_size, ph_count);
    let section_headers =
        parse_section_headers(&reader, class, sh_offset, sh_entry_size, sh_count, shstrndx);
    let symbols = parse_symbols(&reader, class, &section_headers);

    log::debug!(
        "parsed ELF: {:?}/{:?}, {} program headers, {} sections, {} symbols",
        class,
        encoding,
        program_headers.len(),
        section_headers.len(),
        symbols.len()
    );

    Ok(ElfBinary {
        class,
        encoding,
        entry,
        program_headers,
        section_headers,
        symbols,
    })
}

/// Field offsets inside the ELF header that differ by class.
struct HeaderLayout {
    phoff: usize,
    shoff: usize,
    phentsize: usize,
    phnum: usize,
    shentsize: usize,
    shnum: usize,
    shstrndx: usize,
}

impl HeaderLayout {
    fn for_class(class: ElfClass) -> Self {
        match class {
            ElfClass::Elf32 => HeaderLayout {
                phoff: 28,
                shoff: 32,
                phentsize: 42,
                phnum: 44,
                shentsize: 46,
                shnum: 48,
                shstrndx: 50,
            },
            ElfClass::Elf64 => HeaderLayout {
                phoff: 32,
                shoff: 40,
                phentsize: 54,
                phnum: 56,
                shentsize: 58,
                shnum: 60,
                shstrndx: 62,
            },
        }
    }
}

fn parse_program_headers(
    reader: &Reader<'_>,
    class: ElfClass,
    table_offset: u64,
    entry_size: usize,
    count: usize,
) -> Vec<ProgramHeader> {
    let minimum = match class {
        ElfClass::Elf32 => 32,
        ElfClass::Elf64 => 56,
    };
    if entry_size < minimum {
        return Vec::new();
    }

    let mut headers = Vec::new();
    for index in 0..count {
        let base = match usize::try_from(table_offset)
            .ok()
            .and_then(|offset| offset.checked_add(index * entry_size))
        {
            Some(base) if base + entry_size <= reader.len() => base,
            _ => break, // entry would run past the buffer
        };

        // 32- and 64-bit layouts order the fields differently
        let header = match class {
            ElfClass::Elf32 => ProgramHeader {
                p_type: reader.u32_at(base).unwrap_or(0),
                offset: reader.addr_at(base + 4).unwrap_or(0),
                vaddr: reader.addr_at(base + 8).unwrap_or(0),
                paddr: reader.addr_at(base + 12).unwrap_or(0),
                filesz: reader.addr_at(base + 16).unwrap_or(0),
                memsz: reader.addr_at(base + 20).unwrap_or(0),
                flags: reader.u32_at(base + 24).unwrap_or(0),
            },
            ElfClass::Elf64 => ProgramHeader {
                p_type: reader.u32_at(base).unwrap_or(0),
                flags: reader.u32_at(base + 4).unwrap_or(0),
                offset: reader.addr_at(base + 8).unwrap_or(0),
                vaddr: reader.addr_at(base + 16).unwrap_or(0),
                paddr: reader.addr_at(base + 24).unwrap_or(0),
                filesz: reader.addr_at(base + 32).unwrap_or(0),
                memsz: reader.addr_at(base + 40).unwrap_or(0),
            },
        };
        headers.push(header);
    }
    headers
}

fn parse_section_headers(
    reader: &Reader<'_>,
    class: ElfClass,
    table_offset: u64,
    entry_size: usize,
    count: usize,
    shstrndx: usize,
) -> Vec<SectionHeader> {
    let minimum = match class {
        ElfClass::Elf32 => 40,
        ElfClass::Elf64 => 64,
    };
    if entry_size < minimum {
        return Vec::new();
    }

    struct RawSection {
        name_index: u32,
        sh_type: u32,
        flags: u64,
        addr: u64,
        offset: u64,
        size: u64,
        link: u32,
        info: u32,
    }

    let mut raw = Vec::new();
    for index in 0..count {
        let base = match usize::try_from(table_offset)
            .ok()
            .and_then(|offset| offset.checked_add(index * entry_size))
        {
            Some(base) if base + entry_size <= reader.len() => base,
            _ => break,
        };

        let section = match class {
            ElfClass::Elf32 => RawSection {
                name_index: reader.u32_at(base).unwrap_or(0),
                sh_type: reader.u32_at(base + 4).unwrap_or(0),
                flags: reader.addr_at(base + 8).unwrap_or(0),
                addr: reader.addr_at(base + 12).unwrap_or(0),
                offset: reader.addr_at(base + 16).unwrap_or(0),
                size: reader.addr_at(base + 20).unwrap_or(0),
                link: reader.u32_at(base + 24).unwrap_or(0),
                info: reader.u32_at(base + 28).unwrap_or(0),
            },
            ElfClass::Elf64 => RawSection {
                name_index: reader.u32_at(base).unwrap_or(0),
                sh_type: reader.u32_at(base + 4).unwrap_or(0),
                flags: reader.addr_at(base + 8).unwrap_or(0),
                addr: reader.addr_at(base + 16).unwrap_or(0),
                offset: reader.addr_at(base + 24).unwrap_or(0),
                size: reader.addr_at(base + 32).unwrap_or(0),
                link: reader.u32_at(base + 40).unwrap_or(0),
                info: reader.u32_at(base + 44).unwrap_or(0),
            },
        };
        raw.push(section);
    }

    // section names live in the string table picked out by e_shstrndx
    let strtab = raw.get(shstrndx).map(|table| (table.offset, table.size));

    raw.into_iter()
        .map(|section| {
            let name = match strtab {
                Some((offset, size)) => reader.string_at(offset, size, section.name_index),
                None => String::new(),
            };
            SectionHeader {
                name,
                sh_type: section.sh_type,
                flags: section.flags,
                addr: section.addr,
                offset: section.offset,
                size: section.size,
                link: section.link,
                info: section.info,
            }
        })
        .collect()
}

fn parse_symbols(
    reader: &Reader<'_>,
    class: ElfClass,
    sections: &[SectionHeader],
) -> Vec<Symbol> {
    let Some(symtab) = sections
        .iter()
        .find(|section| section.sh_type == SHT_SYMTAB || section.sh_type == SHT_DYNSYM)
    else {
        return Vec::new();
    };

    // the symbol names live in the string table named by the link field
    let strtab = sections
        .get(symtab.link as usize)
        .map(|table| (table.offset, table.size));

    let entry_size = match class {
        ElfClass::Elf32 => 16,
        ElfClass::Elf64 => 24,
    };
    let count = (symtab.size / entry_size as u64) as usize;

    let mut symbols = Vec::new();
    for index in 0..count {
        let base = match usize::try_from(symtab.offset)
            .ok()
            .and_then(|offset| offset.checked_add(index * entry_size))
        {
            Some(base) if base + entry_size <= reader.len() => base,
            _ => break,
        };

        let (name_index, value, size, info) = match class {
            ElfClass::Elf32 => (
                reader.u32_at(base).unwrap_or(0),
                reader.addr_at(base + 4).unwrap_or(0),
                reader.addr_at(base + 8).unwrap_or(0),
                reader.byte_at(base + 12).unwrap_or(0),
            ),
            ElfClass::Elf64 => (
                reader.u32_at(base).unwrap_or(0),
                reader.addr_at(base + 8).unwrap_or(0),
                reader.addr_at(base + 16).unwrap_or(0),
                reader.byte_at(base + 4).unwrap_or(0),
            ),
        };

        let name = match strtab {
            Some((offset, size)) => reader.string_at(offset, size, name_index),
            None => String::new(),
        };

        symbols.push(Symbol {
            name,
            value,
            size,
            sym_type: info & 0x0f,
            binding: info >> 4,
        });
    }
    symbols
}

/// Entry symbol names a deployable program is expected to export.
const ENTRY_SYMBOLS: [&str; 3] = ["entrypoint", "_start", "main"];

/// Domain-level well-formedness on top of a successful parse. Findings are
/// advisory strings; a structurally valid image that is not a deployable
/// program still parses.
pub fn validate_bpf_elf(binary: &ElfBinary) -> Vec<String> {
    let mut issues = Vec::new();

    if binary.find_section(".text").is_none() {
        issues.push("missing .text section".to_string());
    }
    if binary.program_headers.is_empty() {
        issues.push("no program headers".to_string());
    }
    let has_entry = binary
        .symbols
        .iter()
        .any(|symbol| ENTRY_SYMBOLS.contains(&symbol.name.as_str()));
    if !has_entry {
        issues.push("no entry symbol (entrypoint, _start, or main)".to_string());
    }

    issues
}
