use crate::config::PROGRESS_INTERVAL;
use crate::registry::Registry;
use std::io;
use tracing::debug;

/// Identifier keys that mark a block as an address object worth keeping.
/// Blocks starting with anything else (person, organisation, mntner, ...)
/// are dropped.
const BLOCK_KEYS: [&str; 4] = ["inetnum:", "inet6num:", "route:", "route6:"];

/// Streams a whois dump and groups its lines into blocks.
///
/// Comment lines (`%`, `#`, `remarks:`) are discarded, a blank line ends
/// the pending block, and only blocks that begin with a recognized
/// identifier key are emitted. The registry tag travels with each block as
/// a synthetic `cust_source:` line so the extractor sees it as an
/// ordinary field.
pub struct BlockSegmenter<I> {
    lines: I,
    source: Option<Registry>,
    pending: Vec<String>,
    emitted: u64,
    done: bool,
}

impl<I> BlockSegmenter<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I, source: Option<Registry>) -> Self {
        Self {
            lines,
            source,
            pending: Vec::new(),
            emitted: 0,
            done: false,
        }
    }

    /// Blocks emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let keep = BLOCK_KEYS
            .iter()
            .any(|key| self.pending[0].starts_with(key));
        let mut block = std::mem::take(&mut self.pending);
        if !keep {
            return None;
        }
        if let Some(source) = self.source {
            block.push(format!("cust_source: {source}"));
        }
        self.emitted += 1;
        if self.emitted % PROGRESS_INTERVAL == 0 {
            debug!(blocks = self.emitted, "segmented another {PROGRESS_INTERVAL} blocks");
        }
        Some(block.join("\n"))
    }
}

impl<I> Iterator for BlockSegmenter<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<io::Result<String>> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => {
                    if line.starts_with('%') || line.starts_with('#') || line.starts_with("remarks:")
                    {
                        continue;
                    }
                    if line.trim().is_empty() {
                        if let Some(block) = self.flush() {
                            return Some(Ok(block));
                        }
                        continue;
                    }
                    self.pending.push(line);
                }
                None => {
                    // a dump without a trailing blank line still ends its
                    // final block at EOF
                    self.done = true;
                    return self.flush().map(Ok);
                }
            }
        }
    }
}
