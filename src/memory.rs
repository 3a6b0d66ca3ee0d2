// src/memory.rs - raw memory helpers
//
// The only sanctioned raw-pointer touch points in the crate. Every other
// module reads or writes process memory through these functions instead of
// dereferencing pointers directly.

/// Copy `length` bytes from `src` to `dst`. Both addresses must be valid for
/// `length` bytes and must not overlap.
///
/// # Safety
/// `src` and `dst` must each be valid, non-overlapping, for `length` bytes.
pub unsafe fn copy_memory(dst: *mut u8, src: *const u8, length: usize) {
    std::ptr::copy_nonoverlapping(src, dst, length);
}

/// Read `length` bytes starting at `src` into an owned `Vec`.
///
/// # Safety
/// `src` must be valid for reads of `length` bytes.
pub unsafe fn read_bytes(src: *const u8, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    if length > 0 {
        copy_memory(out.as_mut_ptr(), src, length);
    }
    out
}

/// Read a little-endian `u32` at `src`.
///
/// # Safety
/// `src` must be valid for a 4-byte read.
pub unsafe fn read_u32(src: *const u8) -> u32 {
    let bytes = read_bytes(src, 4);
    u32::from_le_bytes(bytes.try_into().unwrap())
}

/// Read a little-endian `u16` at `src`.
///
/// # Safety
/// `src` must be valid for a 2-byte read.
pub unsafe fn read_u16(src: *const u8) -> u16 {
    let bytes = read_bytes(src, 2);
    u16::from_le_bytes(bytes.try_into().unwrap())
}

/// Read a NUL-terminated 8-bit string starting at `src`. A null address
/// yields an empty string.
///
/// # Safety
/// `src`, if non-null, must point at a byte sequence that is eventually
/// NUL-terminated within mapped memory.
pub unsafe fn read_cstring(src: *const u8) -> String {
    if src.is_null() {
        return String::new();
    }
    let mut bytes = Vec::new();
    let mut offset = 0isize;
    loop {
        let c = *src.offset(offset);
        if c == 0 {
            break;
        }
        bytes.push(c);
        offset += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read a NUL-terminated 16-bit (UTF-16LE) string starting at `src`, stopping
/// at the first two-zero-byte code unit. A null address yields an empty
/// string.
///
/// # Safety
/// `src`, if non-null, must point at a sequence of 16-bit code units that is
/// eventually terminated by a zero code unit within mapped memory.
pub unsafe fn read_wstring(src: *const u8) -> String {
    if src.is_null() {
        return String::new();
    }
    let mut units = Vec::new();
    let mut offset = 0isize;
    loop {
        let unit = read_u16(src.offset(offset * 2));
        if unit == 0 {
            break;
        }
        units.push(unit);
        offset += 1;
    }
    String::from_utf16_lossy(&units)
}
