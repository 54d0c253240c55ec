mod core;


pub use self::core::{
    Dictionary, END_OF_DICT, END_OF_WORD, RunSummary, merge_streams, remap_parse,
    rank_of, remove_segment_files, run,
};
