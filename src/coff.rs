// src/coff.rs - COFF object file parser
//
// Parses headers, sections, symbols, and relocations out of a raw Windows
// COFF object image, following the Microsoft PE/COFF object file layout
// (IMAGE_FILE_HEADER / IMAGE_SECTION_HEADER / IMAGE_SYMBOL / IMAGE_RELOCATION).
// Every multi-byte field is read via explicit little-endian helpers at
// bounds-checked offsets rather than an unaligned `transmute`/`ptr::read`, so
// malformed or truncated input yields a `LoaderError::Parse` instead of
// undefined behavior.

use crate::error::{LoaderError, Result};

const FILE_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;
const SYMBOL_SIZE: usize = 18;

pub const IMAGE_SYM_CLASS_EXTERNAL: u8 = 2;
pub const IMAGE_SYM_CLASS_STATIC: u8 = 3;

pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;

/// A parsed COFF object image. Constructed once per `load` call and treated
/// as read-only thereafter.
#[derive(Debug)]
pub struct CoffImage {
    pub machine: u16,
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub characteristics: u32,
    /// Raw section bytes as stored in the image (empty for sections with no
    /// file backing, e.g. `.bss`).
    pub raw_data: Vec<u8>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub value: u32,
    pub section_number: i16,
    pub typ: u16,
    pub storage_class: u8,
    pub number_of_aux_symbols: u8,
}

impl Symbol {
    /// A symbol classed as external-undefined: defined nowhere in this
    /// object, resolved either against an import or a BSS slot.
    pub fn is_external_undefined(&self) -> bool {
        self.storage_class == IMAGE_SYM_CLASS_EXTERNAL && self.section_number == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Relocation {
    pub virtual_address: u32,
    pub symbol_table_index: u32,
    pub typ: u16,
}

impl CoffImage {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(LoaderError::Parse("image shorter than COFF file header".into()));
        }

        let machine = read_u16(data, 0)?;
        let number_of_sections = read_u16(data, 2)? as usize;
        let pointer_to_symbol_table = read_u32(data, 8)? as usize;
        let number_of_symbols = read_u32(data, 12)? as usize;
        let size_of_optional_header = read_u16(data, 16)? as usize;

        let symbols = parse_symbols(data, pointer_to_symbol_table, number_of_symbols)?;

        let sections_offset = FILE_HEADER_SIZE + size_of_optional_header;
        let mut sections = Vec::with_capacity(number_of_sections);
        for i in 0..number_of_sections {
            let offset = sections_offset
                .checked_add(i * SECTION_HEADER_SIZE)
                .ok_or_else(|| LoaderError::Parse("section header offset overflow".into()))?;
            sections.push(parse_section(data, offset)?);
        }

        Ok(CoffImage {
            machine,
            sections,
            symbols,
        })
    }

    pub fn symbol_name(&self, index: usize) -> Result<&str> {
        self.symbols
            .get(index)
            .map(|s| s.name.as_str())
            .ok_or_else(|| LoaderError::Parse(format!("symbol index {index} out of range")))
    }
}

fn parse_section(data: &[u8], offset: usize) -> Result<Section> {
    let end = offset
        .checked_add(SECTION_HEADER_SIZE)
        .ok_or_else(|| LoaderError::Parse("section header overflow".into()))?;
    let header = data
        .get(offset..end)
        .ok_or_else(|| LoaderError::Parse("truncated section header".into()))?;

    let raw_name = &header[0..8];
    let name = decode_short_name(raw_name);
    let size_of_raw_data = read_u32(header, 16)?;
    let pointer_to_raw_data = read_u32(header, 20)?;
    let pointer_to_relocations = read_u32(header, 24)?;
    let number_of_relocations = read_u16(header, 32)?;
    let characteristics = read_u32(header, 36)?;

    let raw_data = if size_of_raw_data == 0 || pointer_to_raw_data == 0 {
        Vec::new()
    } else {
        let start = pointer_to_raw_data as usize;
        let end = start
            .checked_add(size_of_raw_data as usize)
            .ok_or_else(|| LoaderError::Parse("section raw data overflow".into()))?;
        data.get(start..end)
            .ok_or_else(|| LoaderError::Parse(format!("section '{name}' raw data out of bounds")))?
            .to_vec()
    };

    let relocations = parse_relocations(data, pointer_to_relocations as usize, number_of_relocations as usize)?;

    Ok(Section {
        name,
        characteristics,
        raw_data,
        relocations,
    })
}

fn parse_relocations(data: &[u8], offset: usize, count: usize) -> Result<Vec<Relocation>> {
    const RELOC_SIZE: usize = 10;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let reloc_offset = offset
            .checked_add(i * RELOC_SIZE)
            .ok_or_else(|| LoaderError::Parse("relocation offset overflow".into()))?;
        let end = reloc_offset
            .checked_add(RELOC_SIZE)
            .ok_or_else(|| LoaderError::Parse("relocation offset overflow".into()))?;
        let record = data
            .get(reloc_offset..end)
            .ok_or_else(|| LoaderError::Parse("truncated relocation record".into()))?;
        out.push(Relocation {
            virtual_address: read_u32(record, 0)?,
            symbol_table_index: read_u32(record, 4)?,
            typ: read_u16(record, 8)?,
        });
    }
    Ok(out)
}

fn parse_symbols(data: &[u8], pointer_to_symbol_table: usize, count: usize) -> Result<Vec<Symbol>> {
    if pointer_to_symbol_table == 0 || count == 0 {
        return Ok(Vec::new());
    }

    let string_table_offset = pointer_to_symbol_table
        .checked_add(count * SYMBOL_SIZE)
        .ok_or_else(|| LoaderError::Parse("string table offset overflow".into()))?;
    let string_table_len = if string_table_offset + 4 <= data.len() {
        read_u32(data, string_table_offset)? as usize
    } else {
        0
    };
    let string_table = data.get(string_table_offset..).unwrap_or(&[]);
    let string_table = &string_table[..string_table_len.min(string_table.len())];

    let mut symbols = Vec::with_capacity(count);
    for i in 0..count {
        let offset = pointer_to_symbol_table + i * SYMBOL_SIZE;
        let end = offset
            .checked_add(SYMBOL_SIZE)
            .ok_or_else(|| LoaderError::Parse("symbol offset overflow".into()))?;
        let record = data
            .get(offset..end)
            .ok_or_else(|| LoaderError::Parse(format!("truncated symbol record at index {i}")))?;

        let raw_name = &record[0..8];
        let name = if raw_name[0..4] == [0, 0, 0, 0] {
            let string_table_rel_offset = u32::from_le_bytes(raw_name[4..8].try_into().unwrap()) as usize;
            read_long_name(string_table, string_table_rel_offset)
        } else {
            decode_short_name(raw_name)
        };

        symbols.push(Symbol {
            name,
            value: read_u32(record, 8)?,
            section_number: read_i16(record, 12)?,
            typ: read_u16(record, 14)?,
            storage_class: record[16],
            number_of_aux_symbols: record[17],
        });
    }
    Ok(symbols)
}

/// `offset` is relative to the start of the string table (which itself
/// begins with the 4-byte length prefix, so the smallest valid offset a long
/// name can point at is 4).
fn read_long_name(string_table: &[u8], offset: usize) -> String {
    match string_table.get(offset..) {
        Some(rest) => {
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            String::from_utf8_lossy(&rest[..end]).into_owned()
        }
        None => format!("<invalid-string-table-offset-{offset}>"),
    }
}

fn decode_short_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| LoaderError::Parse(format!("truncated u32 field at offset {offset}")))
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| LoaderError::Parse(format!("truncated u16 field at offset {offset}")))
}

fn read_i16(data: &[u8], offset: usize) -> Result<i16> {
    data.get(offset..offset + 2)
        .map(|b| i16::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(|| LoaderError::Parse(format!("truncated i16 field at offset {offset}")))
}
