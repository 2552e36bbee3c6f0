//! Advisory check that a response body is an image.

/// Decide whether a response looks like an image.
///
/// A declared `image/*` content type is trusted. Otherwise the leading bytes
/// are matched against known image signatures.
///
/// Returns `None` when the check cannot be performed (the header is not valid
/// text); callers treat that as "carry on" rather than a failure.
pub fn verify_image_content(content_type: Option<&[u8]>, body: &[u8]) -> Option<bool> {
    if let Some(raw) = content_type {
        let declared = std::str::from_utf8(raw).ok()?;
        if declared.trim_start().to_ascii_lowercase().starts_with("image") {
            return Some(true);
        }
    }
    Some(has_image_signature(body))
}

/// Check if the leading bytes match a known image format.
pub fn has_image_signature(header: &[u8]) -> bool {
    // JPEG: FF D8
    if header.starts_with(&[0xFF, 0xD8]) {
        return true;
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return true;
    }

    // GIF: "GIF"
    if header.starts_with(b"GIF") {
        return true;
    }

    // WebP: RIFF....WEBP
    if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        return true;
    }

    // BMP: BM
    if header.starts_with(b"BM") {
        return true;
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    if header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    {
        return true;
    }

    // HEIC/HEIF/AVIF: ftyp box at offset 4
    header.len() >= 12 && &header[4..8] == b"ftyp"
}
