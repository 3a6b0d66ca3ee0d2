// src/pack.rs - argument packer
//
// Serializes a typed argument list into the length-prefixed blob the agent
// API's data parser (`src/runtime.rs`) consumes. Mirrors
// `original_source/src/lighthouse/lighthouse_windows.go`'s `PackArgs` family.

use crate::error::{LoaderError, Result};

/// Pack a sequence of tokens (each prefixed with a type character: `b`, `i`,
/// `s`, `z`, or `Z`) into the wire format an entry point's `BeaconDataParse`
/// expects: an outer 4-byte little-endian length followed by the
/// concatenation of per-argument records.
///
/// Returns an empty `Vec` for an empty token list (no outer length prefix is
/// written in that case, matching the original's `nil` return).
pub fn pack_args(tokens: &[&str]) -> Result<Vec<u8>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut body = Vec::new();
    for token in tokens {
        let mut chars = token.chars();
        let prefix = chars
            .next()
            .ok_or_else(|| LoaderError::Packing("empty argument token".to_string()))?;
        let rest = chars.as_str();

        let packed = match prefix {
            'b' => pack_binary(rest)
                .map_err(|e| LoaderError::Packing(format!("binary packing error for '{rest}': {e}")))?,
            'i' => pack_int_string(rest)
                .map_err(|e| LoaderError::Packing(format!("int packing error for '{rest}': {e}")))?,
            's' => pack_short_string(rest)
                .map_err(|e| LoaderError::Packing(format!("short packing error for '{rest}': {e}")))?,
            'z' => pack_string(rest),
            'Z' => pack_wide_string(rest),
            other => {
                return Err(LoaderError::Packing(format!(
                    "data must be prefixed with 'b', 'i', 's', 'z', or 'Z', got '{other}'"
                )))
            }
        };
        body.extend_from_slice(&packed);
    }

    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// `b` — hex-decode the remainder and prepend a 4-byte LE length.
pub fn pack_binary(hex_str: &str) -> std::result::Result<Vec<u8>, String> {
    let decoded = decode_hex(hex_str)?;
    let mut out = Vec::with_capacity(4 + decoded.len());
    out.extend_from_slice(&(decoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&decoded);
    Ok(out)
}

/// `i` — 4-byte little-endian unsigned integer.
pub fn pack_int(value: u32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

fn pack_int_string(s: &str) -> std::result::Result<Vec<u8>, String> {
    let value: u32 = s.parse().map_err(|_| format!("'{s}' is not a valid u32"))?;
    Ok(pack_int(value))
}

/// `s` — 2-byte little-endian unsigned integer.
pub fn pack_short(value: u16) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

fn pack_short_string(s: &str) -> std::result::Result<Vec<u8>, String> {
    let value: u16 = s.parse().map_err(|_| format!("'{s}' is not a valid u16"))?;
    Ok(pack_short(value))
}

/// `z` — ANSI string. Mirrors the legacy format's quirk: the length prefix
/// counts UTF-16 code units (including the trailing NUL) the same way the
/// wide-string encoding does, but each code unit is then narrowed to its low
/// byte. This is intentional and must be preserved for compatibility with
/// existing BOFs that expect it.
pub fn pack_string(s: &str) -> Vec<u8> {
    let utf16: Vec<u16> = s.encode_utf16().chain(std::iter::once(0)).collect();
    let mut out = Vec::with_capacity(4 + utf16.len());
    out.extend_from_slice(&(utf16.len() as u32).to_le_bytes());
    out.extend(utf16.iter().map(|&unit| unit as u8));
    out
}

/// `Z` — UTF-16LE wide string, 4-byte LE length in bytes followed by the
/// encoded bytes (no trailing NUL is added; the null terminator is implicit
/// in the zero bytes of a zero-length string, matching the original).
pub fn pack_wide_string(s: &str) -> Vec<u8> {
    let utf16: Vec<u16> = s.encode_utf16().collect();
    let mut bytes = Vec::with_capacity(utf16.len() * 2);
    for unit in &utf16 {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&bytes);
    out
}

fn decode_hex(s: &str) -> std::result::Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex string must have an even number of digits".to_string());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> std::result::Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("invalid hex digit '{}'", c as char)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_list_yields_empty_blob() {
        assert_eq!(pack_args(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn empty_ansi_string_matches_wire_spec() {
        let out = pack_args(&["z"]).unwrap();
        // outer length (5: the 4-byte inner length field plus 1 payload
        // byte), inner length (1 code unit: the trailing NUL), one low byte
        // (0x00). See DESIGN.md for why this is 1 code unit, not 4.
        assert_eq!(out, vec![0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn empty_wide_string_matches_wire_spec() {
        let out = pack_args(&["Z"]).unwrap();
        // outer length (4), inner length (0 bytes, no NUL appended for wide strings)
        assert_eq!(out, vec![0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn int_contributes_four_le_bytes() {
        assert_eq!(pack_int(42), vec![0x2a, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn short_contributes_two_le_bytes() {
        assert_eq!(pack_short(7), vec![0x07, 0x00]);
    }

    #[test]
    fn binary_contributes_length_prefixed_hex_decode() {
        assert_eq!(
            pack_binary("DEADBEEF").unwrap(),
            vec![0x04, 0x00, 0x00, 0x00, 0xde, 0xad, 0xbe, 0xef]
        );
    }

    #[test]
    fn unknown_prefix_is_a_packing_error() {
        let err = pack_args(&["x1"]).unwrap_err();
        assert!(matches!(err, LoaderError::Packing(_)));
    }

    #[test]
    fn odd_length_hex_is_a_packing_error() {
        let err = pack_args(&["bABC"]).unwrap_err();
        assert!(matches!(err, LoaderError::Packing(_)));
    }

    #[test]
    fn non_numeric_int_is_a_packing_error() {
        let err = pack_args(&["inotanumber"]).unwrap_err();
        assert!(matches!(err, LoaderError::Packing(_)));
    }

    #[test]
    fn multi_arg_blob_concatenates_in_order() {
        let out = pack_args(&["i1", "s2"]).unwrap();
        assert_eq!(
            out,
            vec![
                0x06, 0x00, 0x00, 0x00, // outer length = 6
                0x01, 0x00, 0x00, 0x00, // i1
                0x02, 0x00, // s2
            ]
        );
    }
}
