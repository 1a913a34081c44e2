//! Extension table and content sniffing for `is-file-type`.

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

const EXTENSIONS: &[(&str, &str)] = &[
    // Images
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".bmp", "image/bmp"),
    (".webp", "image/webp"),
    (".svg", "image/svg+xml"),
    (".ico", "image/x-icon"),
    // Documents
    (".pdf", "application/pdf"),
    (".doc", "application/msword"),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (".xls", "application/vnd.ms-excel"),
    (
        ".xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (".ppt", "application/vnd.ms-powerpoint"),
    (
        ".pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    // Text
    (".txt", "text/plain"),
    (".csv", "text/csv"),
    (".html", "text/html"),
    (".htm", "text/html"),
    (".css", "text/css"),
    (".js", "text/javascript"),
    (".json", "application/json"),
    (".xml", "application/xml"),
    (".yaml", "text/yaml"),
    (".yml", "text/yaml"),
    // Archives
    (".zip", "application/zip"),
    (".gz", "application/gzip"),
    (".tar", "application/x-tar"),
    (".7z", "application/x-7z-compressed"),
    (".rar", "application/x-rar-compressed"),
    // Audio
    (".mp3", "audio/mpeg"),
    (".wav", "audio/wav"),
    (".ogg", "audio/ogg"),
    (".m4a", "audio/mp4"),
    (".flac", "audio/flac"),
    // Video
    (".mp4", "video/mp4"),
    (".avi", "video/x-msvideo"),
    (".mov", "video/quicktime"),
    (".wmv", "video/x-ms-wmv"),
    (".mkv", "video/x-matroska"),
    // Source code
    (".go", "text/x-go"),
    (".py", "text/x-python"),
    (".java", "text/x-java"),
    (".rb", "text/x-ruby"),
    (".php", "text/x-php"),
    (".c", "text/x-c"),
    (".cpp", "text/x-c++"),
    (".rs", "text/x-rust"),
    // Binaries
    (".bin", OCTET_STREAM),
    (".exe", OCTET_STREAM),
    (".dll", OCTET_STREAM),
    (".so", OCTET_STREAM),
    (".dylib", OCTET_STREAM),
];

/// Looks up the MIME type for a lowercase extension with a leading dot.
pub fn for_extension(extension: &str) -> Option<&'static str> {
    EXTENSIONS
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
}

/// Whether plain-text content is an acceptable rendition of `mime`.
pub fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(mime, "application/json" | "application/xml" | "image/svg+xml")
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/gzip"),
    (b"OggS\x00", "audio/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"Rar!\x1a\x07", "application/x-rar-compressed"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
];

const HTML_PREFIXES: &[&str] = &[
    "<!doctype html",
    "<html",
    "<head",
    "<body",
    "<script",
    "<title",
    "<div",
    "<p",
    "<!--",
];

/// Detects the content type of a file from its first bytes.
///
/// Known binary signatures win; otherwise the content is text unless it
/// contains control bytes, in which case it is `application/octet-stream`.
pub fn sniff(head: &[u8]) -> &'static str {
    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return mime;
    }

    if head.len() >= 12 && &head[..4] == b"RIFF" {
        match &head[8..12] {
            b"WEBP" => return "image/webp",
            b"WAVE" => return "audio/wav",
            b"AVI " => return "video/x-msvideo",
            _ => {}
        }
    }

    if head.len() >= 8 && &head[4..8] == b"ftyp" {
        return "video/mp4";
    }

    let first = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    let trimmed = String::from_utf8_lossy(&head[first..]).to_ascii_lowercase();

    if trimmed.starts_with("<?xml") {
        return "text/xml; charset=utf-8";
    }
    if HTML_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
        return "text/html; charset=utf-8";
    }

    let binary = head
        .iter()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f));
    if binary {
        OCTET_STREAM
    } else {
        PLAIN_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_extension() {
        assert_eq!(for_extension(".png"), Some("image/png"));
        assert_eq!(for_extension(".PNG"), Some("image/png"));
        assert_eq!(for_extension(".nope"), None);
    }

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff(b"%PDF-1.7 ..."), "application/pdf");
        assert_eq!(sniff(b"\xff\xd8\xff\xe0"), "image/jpeg");
        assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff(b"\0\0\0\x18ftypmp42"), "video/mp4");
    }

    #[test]
    fn test_sniff_text_and_markup() {
        assert_eq!(sniff(b"hello world\n"), PLAIN_TEXT);
        assert_eq!(sniff(b""), PLAIN_TEXT);
        assert_eq!(sniff(b"  <!DOCTYPE html><html>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<?xml version=\"1.0\"?>"), "text/xml; charset=utf-8");
    }

    #[test]
    fn test_sniff_binary() {
        assert_eq!(sniff(&[0x01, 0x02, 0xff]), OCTET_STREAM);
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/yaml"));
        assert!(is_textual("application/json"));
        assert!(!is_textual("image/png"));
    }
}
