// src/runtime.rs - agent API callback surface
//
// Implements the BeaconOutput/BeaconPrintf/BeaconDataParse family an entry
// point resolves as imports, plus the process-wide key/value store and the
// OS-library symbol resolution path (__imp_ stripping, `<lib>$<proc>`
// Dynamic Function Resolution, kernel32/user32 fallback). Mirrors
// `original_source/src/lighthouse/lighthouse_windows.go`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::error::{LoaderError, Result};
use crate::memory;

pub const CALLBACK_OUTPUT: i32 = 0;
pub const CALLBACK_ERROR: i32 = 1;

thread_local! {
    /// The channel the currently-executing entry point's BeaconOutput/Printf
    /// calls write to. Populated by the loader immediately before invoking
    /// the entry point on its blocking-pool thread and cleared on return.
    static OUTPUT_SINK: RefCell<Option<tokio::sync::mpsc::Sender<(i32, Vec<u8>)>>> = RefCell::new(None);
}

/// Install the output sink for the duration of `f`. Used by the loader to
/// scope a per-`Load`-call channel to the thread the entry point runs on.
pub fn with_output_sink<F, T>(sink: tokio::sync::mpsc::Sender<(i32, Vec<u8>)>, f: F) -> T
where
    F: FnOnce() -> T,
{
    OUTPUT_SINK.with(|cell| *cell.borrow_mut() = Some(sink));
    let result = f();
    OUTPUT_SINK.with(|cell| *cell.borrow_mut() = None);
    result
}

fn emit(channel: i32, data: Vec<u8>) {
    let sent = OUTPUT_SINK.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|sink| sink.blocking_send((channel, data.clone())).is_ok())
    });
    if sent != Some(true) {
        tracing::warn!("BOF output emitted with no active output sink; dropping");
    }
}

// ---------------------------------------------------------------------
// Key/value store
// ---------------------------------------------------------------------

static KV_STORE: OnceLock<Mutex<HashMap<Vec<u8>, usize>>> = OnceLock::new();

fn kv_store() -> &'static Mutex<HashMap<Vec<u8>, usize>> {
    KV_STORE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn add_value(key: Vec<u8>, value: usize) {
    kv_store().lock().unwrap().insert(key, value);
}

pub fn get_value(key: &[u8]) -> usize {
    kv_store().lock().unwrap().get(key).copied().unwrap_or(0)
}

pub fn remove_value(key: &[u8]) {
    kv_store().lock().unwrap().remove(key);
}

// ---------------------------------------------------------------------
// DataParser: state machine behind BeaconDataParse/Int/Short/Extract/Length
// ---------------------------------------------------------------------

/// Walks an argument blob produced by [`crate::pack::pack_args`] (or an
/// equivalent caller), one field at a time. The blob's leading 4-byte
/// length prefix has already been stripped by the time `parse` is called.
#[derive(Debug, Default)]
pub struct DataParser {
    buffer: Vec<u8>,
    offset: usize,
}

impl DataParser {
    /// `buffer` is the full argument blob including its outer 4-byte length
    /// prefix; only the prefix is consumed here, matching `BeaconDataParse`.
    pub fn parse(buffer: &[u8]) -> Self {
        let offset = if buffer.len() >= 4 { 4 } else { buffer.len() };
        DataParser {
            buffer: buffer.to_vec(),
            offset,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_short(&mut self) -> Result<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a 4-byte length-prefixed blob (the wire shape `b`/`z`/`Z`
    /// arguments are packed in) and returns its payload.
    pub fn extract(&mut self) -> Result<Vec<u8>> {
        let len_bytes = self.take(4)?;
        let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        self.take(len)
    }

    fn take(&mut self, n: usize) -> Result<Vec<u8>> {
        let end = self.offset.checked_add(n).filter(|&e| e <= self.buffer.len());
        match end {
            Some(end) => {
                let slice = self.buffer[self.offset..end].to_vec();
                self.offset = end;
                Ok(slice)
            }
            None => Err(LoaderError::RuntimeFault(format!(
                "BeaconData read past end of buffer ({n} bytes requested, {} remaining)",
                self.remaining()
            ))),
        }
    }
}

// ---------------------------------------------------------------------
// printf-style formatting
// ---------------------------------------------------------------------

/// Substitutes `%s`/`%p`/other directives in `fmt` against the fixed 10-arg
/// window (`arg0..arg9`) captured by the `extern "C"` shim, mirroring
/// `GetCoffPrintfForChannel`'s directive loop.
///
/// # Safety
/// Each `usize` argument that is consumed by a `%s` directive must be a
/// valid pointer to a NUL- (or double-NUL-, for wide) terminated string, or
/// null.
unsafe fn format_directives(fmt: &str, args: [usize; 10]) -> String {
    let mut out = String::new();
    let mut arg_idx = 0;
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => {
                let ptr = args.get(arg_idx).copied().unwrap_or(0) as *const u8;
                arg_idx += 1;
                let ansi = memory::read_cstring(ptr);
                // Ported quirk: a suspiciously short ANSI read often means the
                // pointer actually referenced a wide string whose every other
                // byte happened to be a printable low byte; re-read as UTF-16
                // in that case.
                if ansi.len() < 5 && !ptr.is_null() {
                    let wide = memory::read_wstring(ptr);
                    out.push_str(if wide.len() > ansi.len() { &wide } else { &ansi });
                } else {
                    out.push_str(&ansi);
                }
            }
            Some('p') => {
                let value = args.get(arg_idx).copied().unwrap_or(0);
                arg_idx += 1;
                out.push_str(&format!("0x{value:x}"));
            }
            Some('d') | Some('i') => {
                let value = args.get(arg_idx).copied().unwrap_or(0) as i32;
                arg_idx += 1;
                out.push_str(&value.to_string());
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

// ---------------------------------------------------------------------
// extern "C" shims an entry point's relocations resolve against
// ---------------------------------------------------------------------

pub unsafe extern "C" fn beacon_output(kind: i32, data: *const u8, len: i32) {
    if data.is_null() || len <= 0 {
        return;
    }
    let bytes = memory::read_bytes(data, len as usize);
    emit(kind, bytes);
}

#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn beacon_printf(
    kind: i32,
    fmt: *const u8,
    a0: usize,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
    a7: usize,
    a8: usize,
    a9: usize,
) {
    if fmt.is_null() {
        return;
    }
    let fmt_str = memory::read_cstring(fmt);
    let rendered = format_directives(&fmt_str, [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9]);
    emit(kind, rendered.into_bytes());
}

pub unsafe extern "C" fn beacon_add_value(key: *const u8, value: usize) {
    if key.is_null() {
        return;
    }
    add_value(memory::read_cstring(key).into_bytes(), value);
}

pub unsafe extern "C" fn beacon_get_value(key: *const u8) -> usize {
    if key.is_null() {
        return 0;
    }
    get_value(memory::read_cstring(key).as_bytes())
}

pub unsafe extern "C" fn beacon_remove_value(key: *const u8) {
    if key.is_null() {
        return;
    }
    remove_value(memory::read_cstring(key).as_bytes());
}

// The `datap` struct BOF source compiles against (beacon.h):
//
//   typedef struct {
//       char *original; // the original buffer, unmodified
//       char *buffer;   // current read position
//       int   length;   // bytes remaining from `buffer`
//       int   size;     // total size of `original`
//   } datap;
//
// Entry points allocate this struct themselves (on their own stack) and
// pass a pointer to it into each `BeaconData*` call; these shims read and
// write its fields at fixed offsets rather than owning any parser state of
// their own. `crate::runtime::DataParser` is the safe Rust-native
// equivalent used internally by this crate's own tests and by hosts that
// drive a load through the library API directly rather than through a
// compiled BOF's calls into its own `datap`.
const DATAP_ORIGINAL_OFFSET: isize = 0;
const DATAP_BUFFER_OFFSET: isize = 8;
const DATAP_LENGTH_OFFSET: isize = 16;
const DATAP_SIZE_OFFSET: isize = 20;

unsafe fn datap_field_ptr(parser: *mut u8, offset: isize) -> *mut u8 {
    parser.offset(offset)
}

pub unsafe extern "C" fn beacon_data_parse(parser: *mut u8, buffer: *const u8, size: i32) {
    if parser.is_null() {
        return;
    }
    // Skip the outer 4-byte length prefix `pack_args` writes, matching
    // `DataParser::parse`.
    let skip = if size >= 4 { 4 } else { size.max(0) };
    std::ptr::write_unaligned(datap_field_ptr(parser, DATAP_ORIGINAL_OFFSET) as *mut usize, buffer as usize);
    std::ptr::write_unaligned(
        datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *mut usize,
        buffer.offset(skip as isize) as usize,
    );
    std::ptr::write_unaligned(datap_field_ptr(parser, DATAP_LENGTH_OFFSET) as *mut i32, size - skip);
    std::ptr::write_unaligned(datap_field_ptr(parser, DATAP_SIZE_OFFSET) as *mut i32, size);
}

pub unsafe extern "C" fn beacon_data_int(parser: *mut u8) -> i32 {
    if parser.is_null() {
        return 0;
    }
    let value = memory::read_u32(*(datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *const *const u8)) as i32;
    advance_datap(parser, 4);
    value
}

pub unsafe extern "C" fn beacon_data_short(parser: *mut u8) -> i16 {
    if parser.is_null() {
        return 0;
    }
    let value = memory::read_u16(*(datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *const *const u8)) as i16;
    advance_datap(parser, 2);
    value
}

pub unsafe extern "C" fn beacon_data_length(parser: *mut u8) -> i32 {
    if parser.is_null() {
        return 0;
    }
    std::ptr::read_unaligned(datap_field_ptr(parser, DATAP_LENGTH_OFFSET) as *const i32)
}

pub unsafe extern "C" fn beacon_data_extract(parser: *mut u8, size_out: *mut i32) -> *mut u8 {
    if parser.is_null() {
        if !size_out.is_null() {
            std::ptr::write_unaligned(size_out, 0);
        }
        return std::ptr::null_mut();
    }
    let current = *(datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *const *const u8);
    let extracted_len = memory::read_u32(current) as i32;
    advance_datap(parser, 4);
    let payload = *(datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *const *const u8);
    advance_datap(parser, extracted_len);
    if !size_out.is_null() {
        std::ptr::write_unaligned(size_out, extracted_len);
    }
    payload as *mut u8
}

/// Advances `buffer` by `n` bytes and shrinks `length` by the same amount,
/// clamping at zero so a malformed BOF can't push the parser past its own
/// backing buffer's remaining length into an unbounded negative.
unsafe fn advance_datap(parser: *mut u8, n: i32) {
    let buffer_field = datap_field_ptr(parser, DATAP_BUFFER_OFFSET) as *mut usize;
    let current = std::ptr::read_unaligned(buffer_field);
    std::ptr::write_unaligned(buffer_field, current + n.max(0) as usize);

    let length_field = datap_field_ptr(parser, DATAP_LENGTH_OFFSET) as *mut i32;
    let remaining = std::ptr::read_unaligned(length_field);
    std::ptr::write_unaligned(length_field, (remaining - n).max(0));
}

/// Table of Beacon API symbol names this crate implements directly, paired
/// with the address an import relocation should patch in. Anything named
/// `Beacon*` that is not in this table is a named-but-unimplemented API and
/// resolution must fail loudly rather than silently binding to zero.
pub fn resolve_beacon_api(name: &str) -> Option<usize> {
    match name {
        "BeaconOutput" => Some(beacon_output as usize),
        "BeaconPrintf" => Some(beacon_printf as usize),
        "BeaconAddValue" => Some(beacon_add_value as usize),
        "BeaconGetValue" => Some(beacon_get_value as usize),
        "BeaconRemoveValue" => Some(beacon_remove_value as usize),
        "BeaconDataParse" => Some(beacon_data_parse as usize),
        "BeaconDataInt" => Some(beacon_data_int as usize),
        "BeaconDataShort" => Some(beacon_data_short as usize),
        "BeaconDataLength" => Some(beacon_data_length as usize),
        "BeaconDataExtract" => Some(beacon_data_extract as usize),
        // `original_source` references these (token impersonation,
        // process injection, spawn-to formatting) but never implements
        // them either - they fall through to its own unknown-symbol
        // branch. Process injection and token impersonation are outside
        // this crate's scope, so they stay unresolved here too rather
        // than gaining a stub that silently no-ops.
        "BeaconUseToken" | "BeaconRevertToken" | "BeaconIsAdmin" | "BeaconGetSpawnTo"
        | "BeaconInjectProcess" | "BeaconInjectTemporaryProcess" | "BeaconSpawnTemporaryProcess"
        | "BeaconCleanupProcess" | "BeaconFormatAlloc" | "BeaconFormatReset" | "BeaconFormatFree"
        | "BeaconFormatAppend" | "BeaconFormatPrintf" | "BeaconFormatToString" | "BeaconFormatInt" => None,
        _ => None,
    }
}

pub fn is_beacon_symbol(name: &str) -> bool {
    name.starts_with("Beacon")
}

// ---------------------------------------------------------------------
// OS import resolution
// ---------------------------------------------------------------------

/// §6's fixed symbol→library allowlist. A plain OS import outside this table
/// (and outside the `<lib>$<proc>` Dynamic Function Resolution form) is not
/// resolved against arbitrary libraries — it fails the load naming the
/// symbol, per §4.3/§8.
fn well_known_library(name: &str) -> Option<&'static str> {
    match name {
        "FreeLibrary" | "LoadLibraryA" | "GetProcAddress" | "GetModuleHandleA" | "GetModuleFileNameA" => {
            Some("kernel32.dll")
        }
        "MessageBoxA" => Some("user32.dll"),
        _ => None,
    }
}

/// Resolves an external symbol name to an address: a Beacon API implemented
/// in this crate, a Dynamic-Function-Resolution `<lib>$<proc>` import, or a
/// plain OS import named in §6's allowlist ([`well_known_library`]).
pub fn resolve_external(raw_name: &str) -> Result<usize> {
    let name = raw_name.strip_prefix("__imp_").unwrap_or(raw_name);

    if is_beacon_symbol(name) {
        return resolve_beacon_api(name)
            .ok_or_else(|| LoaderError::SymbolResolution(format!("{name} is a named Beacon API with no implementation")));
    }

    if let Some((lib, proc)) = name.split_once('$') {
        return resolve_from_library(lib, proc);
    }

    if let Some(lib) = well_known_library(name) {
        return resolve_from_library(lib, name);
    }

    Err(LoaderError::SymbolResolution(name.to_string()))
}

#[cfg(windows)]
fn resolve_from_library(lib: &str, proc: &str) -> Result<usize> {
    use std::ffi::CString;
    use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress, LoadLibraryA};

    let lib_c = CString::new(lib).map_err(|e| LoaderError::SymbolResolution(e.to_string()))?;
    let proc_c = CString::new(proc).map_err(|e| LoaderError::SymbolResolution(e.to_string()))?;

    unsafe {
        let mut handle = GetModuleHandleA(lib_c.as_ptr() as *const u8);
        if handle == 0 {
            handle = LoadLibraryA(lib_c.as_ptr() as *const u8);
        }
        if handle == 0 {
            return Err(LoaderError::SymbolResolution(format!("could not load library '{lib}'")));
        }
        match GetProcAddress(handle, proc_c.as_ptr() as *const u8) {
            Some(addr) => Ok(addr as usize),
            None => Err(LoaderError::SymbolResolution(format!("'{proc}' not found in '{lib}'"))),
        }
    }
}

#[cfg(not(windows))]
fn resolve_from_library(lib: &str, proc: &str) -> Result<usize> {
    Err(LoaderError::SymbolResolution(format!(
        "cannot resolve OS import '{proc}' from '{lib}' on a non-Windows host"
    )))
}
