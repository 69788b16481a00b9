//! Minimal ELF64 little-endian images for resolver tests
//!
//! Only headers are meaningful. Payload bytes are zero, which is all the
//! resolver ever needs.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;
pub const PT_GNU_STACK: u32 = 0x6474_e551;
pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;
const SHDR_SIZE: usize = 64;
const SYM_SIZE: usize = 24;
const SHSTRTAB: &[u8] = b"\0.text\0.shstrtab\0.dynsym\0.dynstr\0";
const TEXT_NAME: u32 = 1;
const SHSTRTAB_NAME: u32 = 7;
const DYNSYM_NAME: u32 = 17;
const DYNSTR_NAME: u32 = 25;
/// STB_GLOBAL << 4 | STT_FUNC
const GLOBAL_FUNC: u8 = 0x12;

#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
}

pub fn load(flags: u32, offset: u64, filesz: u64) -> Segment {
    Segment { p_type: PT_LOAD, flags, offset, vaddr: offset, filesz }
}

/// Builder for an `ET_DYN` x86-64 image
#[derive(Debug, Default)]
pub struct ElfImage {
    segments: Vec<Segment>,
    /// (file offset, address, size) of `.text`
    text: Option<(u64, u64, u64)>,
    /// (name, address) of functions exported through `.dynsym`
    exports: Vec<(String, u64)>,
}

impl ElfImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn text_section(mut self, offset: u64, addr: u64, size: u64) -> Self {
        self.text = Some((offset, addr, size));
        self
    }

    /// Export a function defined in `.text` through `.dynsym`, the only
    /// symbol table a stripped binary keeps
    pub fn export(mut self, name: &str, addr: u64) -> Self {
        self.exports.push((name.to_string(), addr));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let phoff = EHDR_SIZE;
        let headers_end = phoff + self.segments.len() * PHDR_SIZE;

        let payload_end = self
            .segments
            .iter()
            .map(|s| s.offset + s.filesz)
            .chain(self.text.map(|(offset, _, size)| offset + size))
            .max()
            .unwrap_or(0) as usize;

        // Section data and headers go after everything the segments cover
        let shstrtab_off = payload_end.max(headers_end).next_multiple_of(16);
        let mut dynstr = vec![0u8];
        let mut name_offsets = Vec::new();
        for (name, _) in &self.exports {
            name_offsets.push(dynstr.len() as u32);
            dynstr.extend_from_slice(name.as_bytes());
            dynstr.push(0);
        }
        let dynstr_off = shstrtab_off + SHSTRTAB.len();
        let dynsym_off = (dynstr_off + dynstr.len()).next_multiple_of(8);
        let dynsym_size = (self.exports.len() + 1) * SYM_SIZE;

        let with_exports = self.text.is_some() && !self.exports.is_empty();
        let sections_end = if with_exports { dynsym_off + dynsym_size } else { dynstr_off };
        let shoff = sections_end.next_multiple_of(16);
        let shnum: u16 = match (self.text.is_some(), with_exports) {
            (false, _) => 0,
            (true, false) => 3,
            (true, true) => 5,
        };
        let total = shoff + usize::from(shnum) * SHDR_SIZE;

        let mut out = vec![0u8; total];

        // e_ident
        out[..4].copy_from_slice(b"\x7fELF");
        out[4] = 2; // ELFCLASS64
        out[5] = 1; // ELFDATA2LSB
        out[6] = 1; // EV_CURRENT

        let mut w = Writer { buf: &mut out, pos: 16 };
        w.u16(3); // ET_DYN
        w.u16(62); // EM_X86_64
        w.u32(1);
        w.u64(0x1040); // e_entry
        w.u64(if self.segments.is_empty() { 0 } else { phoff as u64 });
        w.u64(if shnum == 0 { 0 } else { shoff as u64 });
        w.u32(0);
        w.u16(EHDR_SIZE as u16);
        w.u16(PHDR_SIZE as u16);
        w.u16(self.segments.len() as u16);
        w.u16(SHDR_SIZE as u16);
        w.u16(shnum);
        w.u16(if shnum == 0 { 0 } else { 2 });

        w.pos = phoff;
        for s in &self.segments {
            w.u32(s.p_type);
            w.u32(s.flags);
            w.u64(s.offset);
            w.u64(s.vaddr);
            w.u64(s.vaddr);
            w.u64(s.filesz);
            w.u64(s.filesz);
            w.u64(0x1000);
        }

        if let Some((text_off, text_addr, text_size)) = self.text {
            w.buf[shstrtab_off..shstrtab_off + SHSTRTAB.len()].copy_from_slice(SHSTRTAB);

            // [0] SHT_NULL is all zeroes
            w.pos = shoff + SHDR_SIZE;
            section_header(&mut w, TEXT_NAME, 1, 0x6, text_addr, text_off, text_size);
            section_header(
                &mut w,
                SHSTRTAB_NAME,
                3,
                0,
                0,
                shstrtab_off as u64,
                SHSTRTAB.len() as u64,
            );

            if with_exports {
                // [3] .dynsym, linked to [4] .dynstr
                section_header(&mut w, DYNSYM_NAME, 11, 0x2, 0, dynsym_off as u64, dynsym_size as u64);
                // sh_link = 4, sh_info = 1 (first global), sh_entsize
                w.buf[w.pos - 24..w.pos - 16].copy_from_slice(&[4, 0, 0, 0, 1, 0, 0, 0]);
                w.buf[w.pos - 8..w.pos].copy_from_slice(&(SYM_SIZE as u64).to_le_bytes());
                section_header(&mut w, DYNSTR_NAME, 3, 0x2, 0, dynstr_off as u64, dynstr.len() as u64);

                w.buf[dynstr_off..dynstr_off + dynstr.len()].copy_from_slice(&dynstr);

                // Entry 0 is the null symbol
                w.pos = dynsym_off + SYM_SIZE;
                for ((_, addr), name) in self.exports.iter().zip(name_offsets) {
                    w.u32(name);
                    w.put(&[GLOBAL_FUNC, 0]);
                    w.u16(1); // defined in .text
                    w.u64(*addr);
                    w.u64(0x10);
                }
            }
        }

        out
    }

    /// Write the image to a temporary file that lives as long as the handle
    pub fn write(&self) -> NamedTempFile {
        write_bytes(&self.build())
    }
}

pub fn write_bytes(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write ELF image");
    file.flush().expect("flush ELF image");
    file
}

/// Overwrite `sh_offset` of section header 1 (`.text`) in a built image
pub fn set_text_offset(image: &mut [u8], offset: u64) {
    let shoff = u64::from_le_bytes(image[40..48].try_into().unwrap()) as usize;
    let field = shoff + SHDR_SIZE + 24;
    image[field..field + 8].copy_from_slice(&offset.to_le_bytes());
}

fn section_header(w: &mut Writer<'_>, name: u32, sh_type: u32, flags: u64, addr: u64, offset: u64, size: u64) {
    w.u32(name);
    w.u32(sh_type);
    w.u64(flags);
    w.u64(addr);
    w.u64(offset);
    w.u64(size);
    w.u32(0);
    w.u32(0);
    w.u64(16);
    w.u64(0);
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.put(&v.to_le_bytes());
    }
}

/// Headers laid out like a small PIE: R, R-X at 0x1000, R, RW
pub fn typical_pie() -> ElfImage {
    ElfImage::new()
        .segment(load(PF_R, 0, 0x628))
        .segment(load(PF_R | PF_X, 0x1000, 0x1000))
        .segment(load(PF_R, 0x2000, 0x200))
        .segment(load(PF_R | PF_W, 0x2db8, 0x258))
}
