#![allow(dead_code)]

use std::io;

/// An in-memory [`io::Write`] that can be told to start failing.
pub struct Writer {
    buf: Vec<u8>,
    /// The number of writes that succeed before every further write fails.
    remaining: Option<usize>,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            remaining: None,
        }
    }

    /// Only the first `max` calls to `write` succeed.
    pub fn with_max(max: usize) -> Self {
        Self {
            buf: Vec::new(),
            remaining: Some(max),
        }
    }

    #[track_caller]
    pub fn into_string(self) -> String {
        String::from_utf8(self.buf).expect("rendered output is UTF-8")
    }
}

impl io::Write for Writer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "writer is full"));
            }
            *remaining -= 1;
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
