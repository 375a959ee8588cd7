/// Platform newline every line gets re-terminated with.
#[cfg(windows)]
pub const LINE_ENDING: &[u8] = b"\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &[u8] = b"\n";

/// Rewrites a byte stream line by line, fed one chunk at a time.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`, and each one is re-terminated with
/// [`LINE_ENDING`]. A `\r\n` split across two chunks still counts as one terminator.
/// Bytes inside a line are copied untouched, no decoding happens.
#[derive(Debug, Default)]
pub struct LineNormalizer {
    pending_cr: bool,
    line_open: bool,
}

impl LineNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the normalized form of `chunk` to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.reserve(chunk.len());
        for &byte in chunk {
            if std::mem::take(&mut self.pending_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\r' => {
                    self.end_line(out);
                    self.pending_cr = true;
                }
                b'\n' => self.end_line(out),
                _ => {
                    out.push(byte);
                    self.line_open = true;
                }
            }
        }
    }

    /// Terminates a trailing line that had no terminator of its own.
    pub fn finish(mut self, out: &mut Vec<u8>) {
        if self.line_open {
            self.end_line(out);
        }
    }

    #[inline]
    fn end_line(&mut self, out: &mut Vec<u8>) {
        out.extend_from_slice(LINE_ENDING);
        self.line_open = false;
    }
}
