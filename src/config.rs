/// Blocks a worker accepts between transaction commits
pub const COMMIT_COUNT: u64 = 10_000;

/// Upper bound on blocks buffered between the producer and the workers
pub const BLOCK_QUEUE_CAPACITY: usize = 10_000;

/// Progress update interval (tick every N blocks)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Dump files looked for when an import path is a directory
pub const DEFAULT_DUMP_FILES: &[&str] = &[
    "afrinic.db.gz",
    "apnic.db.inet6num.gz",
    "apnic.db.inetnum.gz",
    "arin.db",
    "delegated-lacnic-extended-latest",
    "ripe.db.inetnum.gz",
    "ripe.db.inet6num.gz",
];
