//! Download progress decoration
//!
//! Wraps a download body in a byte-styled progress bar when the total length
//! is known and the terminal is interactive; otherwise the reader passes
//! through untouched.

use std::io::{IsTerminal, Read};

use indicatif::{ProgressBar, ProgressStyle};

/// Wrap `reader` with a progress bar when `length` is known and stderr is a
/// terminal.
pub fn reader_with_progress<R: Read + 'static>(
    reader: R,
    length: Option<u64>,
    message: impl Into<String>,
) -> Box<dyn Read> {
    let Some(length) = length else {
        return Box::new(reader);
    };
    if !std::io::stderr().is_terminal() {
        return Box::new(reader);
    }

    let bar = ProgressBar::new(length);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .expect("progress bar template")
            .progress_chars("#>-"),
    );
    bar.set_message(message.into());
    Box::new(bar.wrap_read(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_passthrough_preserves_content() {
        let data = b"plugin bytes".to_vec();
        let mut wrapped = reader_with_progress(Cursor::new(data.clone()), None, "Downloading");
        let mut out = Vec::new();
        wrapped.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_known_length_preserves_content() {
        let data = b"plugin bytes".to_vec();
        let mut wrapped = reader_with_progress(
            Cursor::new(data.clone()),
            Some(data.len() as u64),
            "Downloading",
        );
        let mut out = Vec::new();
        wrapped.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
