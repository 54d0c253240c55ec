use crate::dict::Occ;
use crate::error::PfpError;

/// Sentinel byte marking the start and end of the text. Input bytes at or
/// below it are reserved.
pub const SENTINEL: u8 = 0x02;

/// Width in bytes of a suffix-info record.
pub const IBYTES: usize = 5;

/// Dictionary shards per scanner thread when no explicit count is given.
pub const SHARDS_PER_THREAD: usize = 8;

/// Configuration for a parse.
#[derive(Clone, Debug)]
pub struct ParseConfig {
    /// Window size `w`: the fingerprint width and the overlap between words.
    pub window: usize,
    /// A window whose fingerprint is divisible by `modulus` ends a word.
    pub modulus: u64,
    pub threads: usize,
    /// Dictionary shard count; 0 derives it from `threads`.
    pub shards: usize,
    /// Also write the ending position of every word.
    pub sa_info: bool,
    pub max_occurrences: Occ,
    /// Keep the per-segment files after they have been merged.
    pub keep_temp: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            window: 10,
            modulus: 100,
            threads: 1,
            shards: 0,
            sa_info: false,
            max_occurrences: Occ::MAX,
            keep_temp: false,
        }
    }
}

impl ParseConfig {
    pub fn validate(&self) -> Result<(), PfpError> {
        if self.window == 0 {
            return Err(PfpError::InvalidConfig("window size must be positive".into()));
        }
        if self.modulus == 0 {
            return Err(PfpError::InvalidConfig("modulus must be positive".into()));
        }
        if self.threads == 0 {
            return Err(PfpError::InvalidConfig(
                "thread count must be positive".into(),
            ));
        }
        if self.max_occurrences == 0 {
            return Err(PfpError::InvalidConfig(
                "maximum occurrence count must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn shard_count(&self) -> usize {
        if self.shards == 0 {
            self.threads.max(1) * SHARDS_PER_THREAD
        } else {
            self.shards
        }
    }
}
