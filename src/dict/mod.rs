mod core;


pub use self::core::{Occ, ShardedDict, WordStats};
