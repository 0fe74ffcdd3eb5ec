/// Split `text` on `"\r\n"`, `'\n'` and a lone `'\r'`.
///
/// N separators yield N+1 segments, so trailing empty segments are preserved.
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                segments.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                segments.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    segments.push(&text[start..]);
    segments
}

/// Character count with one char per separator, matching the document index space.
pub(crate) fn normalized_char_count(text: &str) -> usize {
    let segments = split_lines(text);
    let chars: usize = segments.iter().map(|s| s.chars().count()).sum();
    chars + segments.len() - 1
}
