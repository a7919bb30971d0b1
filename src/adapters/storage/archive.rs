//! tar.gz encoding shared by both storage backends
//!
//! Headers are written with fixed mode and a caller-supplied mtime so the two
//! backends produce byte-compatible archives for the same inputs.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

pub struct ArchiveWriter<W: Write> {
    builder: tar::Builder<GzEncoder<W>>,
    mtime: u64,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W, mtime: u64) -> Self {
        let encoder = GzEncoder::new(inner, Compression::default());
        Self {
            builder: tar::Builder::new(encoder),
            mtime,
        }
    }

    /// Appends one regular file of exactly `size` bytes read from `data`
    pub fn append<R: Read>(&mut self, name: &str, size: u64, data: R) -> io::Result<()> {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_mtime(self.mtime);
        self.builder.append_data(&mut header, name, data)
    }

    /// Writes the tar trailer, flushes the gzip stream and returns the sink
    pub fn finish(self) -> io::Result<W> {
        self.builder.into_inner()?.finish()
    }
}

impl ArchiveWriter<Vec<u8>> {
    /// Takes the compressed bytes produced so far, leaving the buffer empty
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(self.builder.get_mut().get_mut())
    }
}
