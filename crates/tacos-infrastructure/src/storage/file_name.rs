//! Reversible mapping from record ids to file stems.
//!
//! Session ids come from the application and may contain path separators or
//! other characters that are unsafe in file names. Anything outside
//! `[A-Za-z0-9_-]` is written as `%XX` (one escape per UTF-8 byte).

/// Encodes an id into a file stem safe on every platform.
pub fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Reverses [`encode_file_stem`]. Returns `None` for stems it did not produce.
pub fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
