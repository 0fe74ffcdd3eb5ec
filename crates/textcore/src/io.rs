//! Loading and saving [`Content`] through `std::io`.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use tracing::debug;

use crate::config::ContentConfig;
use crate::content::Content;
use crate::error::Result;
use crate::line::ContentLine;
use crate::line_ending::LineEnding;

impl Content {
    /// Read a document from `reader` with the default config.
    ///
    /// `\n`, `\r\n` and a lone `\r` all end a line; the dominant one becomes the document's
    /// [`LineEnding`]. Nothing is recorded for undo.
    pub fn read_from(reader: impl Read) -> Result<Content> {
        Self::read_from_with_config(reader, ContentConfig::default())
    }

    /// Read a document from `reader` with `config`.
    pub fn read_from_with_config(reader: impl Read, config: ContentConfig) -> Result<Content> {
        config.validate()?;
        let mut reader = BufReader::new(reader);
        let mut lines = Vec::with_capacity(config.initial_line_capacity);
        let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
        let mut ends_with_separator = true;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            // A chunk always ends at '\n' or EOF, so "\r\n" and multi-byte chars never straddle
            // two chunks.
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let chunk = std::str::from_utf8(&buf)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

            let body = match chunk.strip_suffix('\n') {
                Some(body) => {
                    ends_with_separator = true;
                    match body.strip_suffix('\r') {
                        Some(body) => {
                            crlf += 1;
                            body
                        }
                        None => {
                            lf += 1;
                            body
                        }
                    }
                }
                None => {
                    ends_with_separator = false;
                    chunk
                }
            };
            for (i, part) in body.split('\r').enumerate() {
                if i > 0 {
                    cr += 1;
                }
                lines.push(ContentLine::from_text(part));
            }
        }
        if ends_with_separator {
            lines.push(ContentLine::new());
        }

        let line_ending = LineEnding::from_counts(lf, crlf, cr);
        debug!(lines = lines.len(), ?line_ending, "content loaded");
        Ok(Content::from_lines(lines, line_ending, config))
    }

    /// Write the document to `writer`, separating lines with the document [`LineEnding`].
    pub fn write_to(&self, writer: impl Write) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        let separator = self.line_ending().as_str();
        for (i, line) in self.lines().iter().enumerate() {
            if i > 0 {
                writer.write_all(separator.as_bytes())?;
            }
            writer.write_all(line.as_str().as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines_of(content: &Content) -> Vec<&str> {
        content.lines().iter().map(ContentLine::as_str).collect()
    }

    #[test]
    fn test_read_mixed_separators() {
        let content = Content::read_from("a\r\nb\rc\n\r\nd".as_bytes()).unwrap();
        assert_eq!(lines_of(&content), vec!["a", "b", "c", "", "d"]);
        assert_eq!(content.len(), 8);
        assert_eq!(content.line_ending(), LineEnding::Crlf);
        assert!(!content.can_undo());
    }

    #[test]
    fn test_read_trailing_separators() {
        let content = Content::read_from("x\n".as_bytes()).unwrap();
        assert_eq!(lines_of(&content), vec!["x", ""]);
        let content = Content::read_from("x\r".as_bytes()).unwrap();
        assert_eq!(lines_of(&content), vec!["x", ""]);
        assert_eq!(content.line_ending(), LineEnding::Cr);
        let content = Content::read_from("".as_bytes()).unwrap();
        assert_eq!(lines_of(&content), vec![""]);
    }

    #[test]
    fn test_read_rejects_invalid_utf8() {
        let bytes: &[u8] = &[b'a', 0xff, b'\n'];
        assert!(Content::read_from(bytes).is_err());
    }

    #[test]
    fn test_write_uses_document_line_ending() {
        let mut content = Content::from_text("a\r\nb");
        content.insert(1, 1, "\nc").unwrap();
        let mut out = Vec::new();
        content.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\r\nb\r\nc");
    }
}
