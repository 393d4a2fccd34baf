//! Line reader for text sources that may contain undecodable lines.

use std::io;
use std::str::Utf8Error;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads a file line by line as raw bytes.
///
/// Unlike [`tokio::io::Lines`], a line that is not valid UTF-8 does not end
/// the stream: it is returned as an inner error and reading continues with the
/// following line.
pub(crate) struct LineReader {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_number: usize,
}

impl LineReader {
    pub(crate) fn new(file: File) -> Self {
        Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// 1-based number of the line returned last.
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line without its `\n` or `\r\n` terminator, or `None` at the end.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<Result<String, Utf8Error>>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(std::str::from_utf8(&self.buf).map(str::to_owned)))
    }
}
