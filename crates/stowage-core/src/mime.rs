//! Content-based MIME detection with an extension fallback.

/// Leading-byte signatures checked before falling back to the extension.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"\x7fELF", "application/x-executable"),
    (b"OggS", "audio/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"<?xml", "text/xml"),
];

/// Detect the MIME type of `contents` stored at `path`.
///
/// Returns `None` when neither the bytes nor the extension say anything.
pub fn detect_mime_type(path: &str, contents: &[u8]) -> Option<String> {
    if let Some(sniffed) = sniff(contents) {
        return Some(sniffed.to_string());
    }

    if let Some(guess) = mime_guess::from_path(path).first() {
        return Some(guess.essence_str().to_string());
    }

    if contents.is_empty() {
        return None;
    }

    if looks_like_text(contents) {
        Some("text/plain".to_string())
    } else {
        Some("application/octet-stream".to_string())
    }
}

fn sniff(contents: &[u8]) -> Option<&'static str> {
    if contents.len() >= 12 && &contents[..4] == b"RIFF" && &contents[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| contents.starts_with(magic))
        .map(|(_, mime)| *mime)
}

fn looks_like_text(contents: &[u8]) -> bool {
    let sample = &contents[..contents.len().min(1024)];
    !sample.contains(&0) && std::str::from_utf8(sample).is_ok()
}
