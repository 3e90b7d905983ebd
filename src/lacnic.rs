use crate::stats::ImportStats;
use std::io;
use std::sync::Arc;
use tracing::warn;

/// Address count of a full IPv4 space, the largest count a delegation line
/// can carry.
const IPV4_SPACE: u64 = 1 << 32;

/// Rewrites LACNIC's pipe-delimited "delegated-extended" feed into the
/// block-oriented key:value shape the rest of the pipeline expects.
///
/// A line like
/// `lacnic|BR|ipv4|200.1.1.0|256|20200101|allocated`
/// becomes
/// ```text
/// inet4num: 200.1.1.0/24
/// country: BR
/// last-modified: 20200101
/// descr: allocated
/// cust_source: lacnic
/// ```
/// Lines that are not seven-field `lacnic` records, carry an unknown
/// allocation type, or declare a non-power-of-two IPv4 address count are
/// dropped with a warning. `asn` lines are out of scope and skipped
/// silently.
pub struct LacnicNormalizer<I> {
    lines: I,
    stats: Arc<ImportStats>,
}

impl<I> LacnicNormalizer<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I, stats: Arc<ImportStats>) -> Self {
        Self { lines, stats }
    }

    fn normalize(&self, line: &str) -> Option<String> {
        if !line.starts_with("lacnic") {
            warn!(line, "line does not start with lacnic");
            self.stats.inc_skipped();
            return None;
        }
        let elements: Vec<&str> = line.split('|').collect();
        if elements.len() < 7 {
            warn!(line, "invalid delegation line");
            self.stats.inc_skipped();
            return None;
        }

        let mut block = Vec::with_capacity(5);
        match elements[2] {
            "ipv4" => {
                let prefix_len = match ipv4_prefix_len(elements[4]) {
                    Some(len) => len,
                    None => {
                        warn!(line, count = elements[4], "address count is not a power of two");
                        self.stats.inc_skipped();
                        return None;
                    }
                };
                block.push(format!("inet4num: {}/{}", elements[3], prefix_len));
            }
            "ipv6" => {
                block.push(format!("inet6num: {}/{}", elements[3], elements[4]));
            }
            "asn" => return None,
            other => {
                warn!(line, kind = other, "unknown inetnum type");
                self.stats.inc_skipped();
                return None;
            }
        }

        if elements[1].len() > 1 {
            block.push(format!("country: {}", elements[1]));
        }
        if !elements[5].is_empty() && elements[5].chars().all(|c| c.is_ascii_digit()) {
            block.push(format!("last-modified: {}", elements[5]));
        }
        block.push(format!("descr: {}", elements[6]));
        block.push("cust_source: lacnic".to_string());

        Some(block.join("\n"))
    }
}

/// Prefix length for a delegation of `count` IPv4 addresses.
///
/// The feed only describes CIDR-aligned delegations, so the count must be
/// an exact power of two no larger than the address space; anything else
/// is a malformed line, not a rounding candidate.
fn ipv4_prefix_len(count: &str) -> Option<u32> {
    let count: u64 = count.parse().ok()?;
    if count == 0 || count > IPV4_SPACE || !count.is_power_of_two() {
        return None;
    }
    Some(32 - count.trailing_zeros())
}

impl<I> Iterator for LacnicNormalizer<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<io::Result<String>> {
        loop {
            match self.lines.next()? {
                Err(e) => return Some(Err(e)),
                Ok(line) => {
                    if let Some(block) = self.normalize(line.trim()) {
                        return Some(Ok(block));
                    }
                }
            }
        }
    }
}
