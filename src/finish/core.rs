use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::common::io::{
    EXT_DICT, EXT_LAST, EXT_OCC, EXT_PARSE, EXT_PARSE_OLD, EXT_SAI, aux_path, aux_path_num,
    create_output, open_noatime, read_file,
};
use crate::dict::{ShardedDict, WordStats};
use crate::error::PfpError;
use crate::parse::{ParseConfig, process_file};

/// Terminates every word in the `.dict` file.
pub const END_OF_WORD: u8 = 0x01;
/// Terminates the `.dict` file.
pub const END_OF_DICT: u8 = 0x00;

/// Width of a parse-stream record.
const HASH_BYTES: usize = std::mem::size_of::<u64>();

/// 1-based rank of the dictionary word at sorted position `index`.
pub fn rank_of(index: usize) -> Result<u32, PfpError> {
    u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .ok_or_else(|| PfpError::Inconsistent(format!("dictionary word {} has no 32-bit rank", index)))
}

/// The dictionary sorted by word text, with 1-based ranks.
pub struct Dictionary {
    entries: Vec<(u64, WordStats)>,
    ranks: HashMap<u64, u32>,
}

impl Dictionary {
    /// Fails if there are more distinct words than a `u32` rank can number.
    pub fn from_shards(dict: ShardedDict) -> Result<Self, PfpError> {
        let mut entries = dict.into_entries();
        entries.par_sort_unstable_by(|a, b| a.1.text.cmp(&b.1.text));
        let ranks = entries
            .iter()
            .enumerate()
            .map(|(i, (hash, _))| Ok((*hash, rank_of(i)?)))
            .collect::<Result<_, PfpError>>()?;
        Ok(Dictionary { entries, ranks })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn rank(&self, hash: u64) -> Option<u32> {
        self.ranks.get(&hash).copied()
    }

    /// Words in rank order.
    pub fn words(&self) -> impl Iterator<Item = &WordStats> {
        self.entries.iter().map(|(_, stats)| stats)
    }

    /// Sum of all occurrence counts, i.e. the number of words in the parse.
    pub fn total_occurrences(&self) -> u64 {
        self.words().map(|w| w.occ as u64).sum()
    }

    /// Write the words, each followed by `END_OF_WORD` and the whole list by
    /// `END_OF_DICT`, and the occurrence counts as native `u32`s.
    /// Returns the number of dictionary bytes written.
    pub fn write_to(&self, dict_out: &mut impl Write, occ_out: &mut impl Write) -> io::Result<u64> {
        let mut bytes = 0u64;
        for stats in self.words() {
            dict_out.write_all(&stats.text)?;
            dict_out.write_all(&[END_OF_WORD])?;
            occ_out.write_all(&stats.occ.to_ne_bytes())?;
            bytes += stats.text.len() as u64 + 1;
        }
        dict_out.write_all(&[END_OF_DICT])?;
        Ok(bytes + 1)
    }

    /// Write `<base>.dict` and `<base>.occ`.
    pub fn write_files(&self, base: &Path) -> Result<u64, PfpError> {
        let dict_path = aux_path(base, EXT_DICT);
        let occ_path = aux_path(base, EXT_OCC);
        let mut dict_out =
            create_output(&dict_path).map_err(|e| PfpError::io("create", &dict_path, e))?;
        let mut occ_out =
            create_output(&occ_path).map_err(|e| PfpError::io("create", &occ_path, e))?;
        let bytes = self
            .write_to(&mut dict_out, &mut occ_out)
            .map_err(|e| PfpError::io("write", &dict_path, e))?;
        dict_out
            .flush()
            .map_err(|e| PfpError::io("flush", &dict_path, e))?;
        occ_out
            .flush()
            .map_err(|e| PfpError::io("flush", &occ_path, e))?;
        Ok(bytes)
    }
}

/// Replace every hash of the per-segment parses by its dictionary rank and
/// write the concatenation, in segment order, to `<base>.parse`.
/// Returns the number of records written.
pub fn remap_parse(base: &Path, segments: usize, dict: &Dictionary) -> Result<u64, PfpError> {
    let out_path = aux_path(base, EXT_PARSE);
    let mut out = create_output(&out_path).map_err(|e| PfpError::io("create", &out_path, e))?;
    let mut records = 0u64;
    for i in 0..segments {
        let path = aux_path_num(base, EXT_PARSE_OLD, i);
        let data = read_file(&path).map_err(|e| PfpError::io("read", &path, e))?;
        if data.len() % HASH_BYTES != 0 {
            return Err(PfpError::Inconsistent(format!(
                "'{}' is not a whole number of hash records",
                path.display()
            )));
        }
        for rec in data.chunks_exact(HASH_BYTES) {
            let mut raw = [0u8; HASH_BYTES];
            raw.copy_from_slice(rec);
            let hash = u64::from_ne_bytes(raw);
            let rank = dict.rank(hash).ok_or_else(|| {
                PfpError::Inconsistent(format!("parse hash {:#x} missing from dictionary", hash))
            })?;
            out.write_all(&rank.to_ne_bytes())
                .map_err(|e| PfpError::io("write", &out_path, e))?;
            records += 1;
        }
    }
    out.flush()
        .map_err(|e| PfpError::io("flush", &out_path, e))?;
    Ok(records)
}

/// Concatenate the per-segment copies of `<base>.<ext>` in segment order.
fn concat_segments(base: &Path, ext: &str, segments: usize) -> Result<u64, PfpError> {
    let out_path = aux_path(base, ext);
    let mut out = create_output(&out_path).map_err(|e| PfpError::io("create", &out_path, e))?;
    let mut total = 0u64;
    for i in 0..segments {
        let path = aux_path_num(base, ext, i);
        let mut part = open_noatime(&path).map_err(|e| PfpError::io("open", &path, e))?;
        total += io::copy(&mut part, &mut out).map_err(|e| PfpError::io("copy", &path, e))?;
    }
    out.flush()
        .map_err(|e| PfpError::io("flush", &out_path, e))?;
    Ok(total)
}

/// Build `<base>.last` and, if requested, `<base>.sai` from the segments.
pub fn merge_streams(base: &Path, segments: usize, sa_info: bool) -> Result<(), PfpError> {
    concat_segments(base, EXT_LAST, segments)?;
    if sa_info {
        concat_segments(base, EXT_SAI, segments)?;
    }
    Ok(())
}

/// Delete the per-segment files.
pub fn remove_segment_files(base: &Path, segments: usize, sa_info: bool) -> Result<(), PfpError> {
    let mut exts = vec![EXT_PARSE_OLD, EXT_LAST];
    if sa_info {
        exts.push(EXT_SAI);
    }
    for i in 0..segments {
        for ext in &exts {
            let path = aux_path_num(base, ext, i);
            fs::remove_file(&path).map_err(|e| PfpError::io("remove", &path, e))?;
        }
    }
    Ok(())
}

/// Totals of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub file_len: u64,
    /// Words in the parse.
    pub words: u64,
    pub distinct_words: usize,
    /// Size of the `.dict` file.
    pub dict_bytes: u64,
}

/// Parse `input` and produce `<base>.dict`, `.occ`, `.parse`, `.last` and
/// optionally `.sai`.
pub fn run(input: &Path, base: &Path, config: &ParseConfig) -> Result<RunSummary, PfpError> {
    config.validate()?;
    let dict = ShardedDict::new(config.shard_count(), config.max_occurrences);
    let outcome = process_file(input, base, config, &dict)?;
    let segments = outcome.segments.len();

    let dictionary = Dictionary::from_shards(dict)?;
    if dictionary.total_occurrences() != outcome.words() {
        return Err(PfpError::Inconsistent(format!(
            "{} words scanned but the dictionary counts {}",
            outcome.words(),
            dictionary.total_occurrences()
        )));
    }
    let dict_bytes = dictionary.write_files(base)?;
    let words = remap_parse(base, segments, &dictionary)?;
    if words != outcome.words() {
        return Err(PfpError::Inconsistent(format!(
            "{} words scanned but {} parse records found",
            outcome.words(),
            words
        )));
    }
    merge_streams(base, segments, config.sa_info)?;
    if !config.keep_temp {
        remove_segment_files(base, segments, config.sa_info)?;
    }

    let summary = RunSummary {
        file_len: outcome.file_len,
        words,
        distinct_words: dictionary.len(),
        dict_bytes,
    };
    info!(
        file_len = summary.file_len,
        words = summary.words,
        distinct = summary.distinct_words,
        dict_bytes = summary.dict_bytes,
        "parse complete"
    );
    Ok(summary)
}

