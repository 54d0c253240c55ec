pub mod config;
pub mod core;
pub mod scanner;
pub mod word;


pub use self::config::{IBYTES, ParseConfig, SENTINEL, SHARDS_PER_THREAD};
pub use self::core::{
    ScanOutcome, check_accounting, effective_threads, open_segment_streams, partition,
    process_file,
};
pub use self::scanner::{ScanContext, first_reserved, scan_segment};
pub use self::word::{OutStream, SegmentOutput, SegmentReport, SegmentState, SegmentStreams};
