use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Gzip magic bytes (1f 8b)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a registry dump, decompressing transparently when the file is
/// gzip-compressed. Detection is by magic bytes, not extension, since
/// mirrors are inconsistent about naming.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open dump file: {}", path.display()))?;

    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if n == 2 && magic == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Line iterator that decodes ISO-8859-1 instead of UTF-8.
///
/// Registry dumps are 8-bit text with no encoding guarantee; Latin-1 maps
/// every byte value to a defined character, so decoding can never fail the
/// way `String::from_utf8` would on a stray high byte.
pub struct Latin1Lines<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Latin1Lines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }
}

impl<R: BufRead> Iterator for Latin1Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<io::Result<String>> {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(self.buf.iter().map(|&b| b as char).collect()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
