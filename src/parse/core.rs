use std::fs::File;
use std::io::BufWriter;
use std::ops::Range;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::common::io::{
    EXT_LAST, EXT_PARSE_OLD, EXT_SAI, aux_path_num, create_output, file_size, open_noatime,
};
use crate::dict::ShardedDict;
use crate::error::PfpError;

use super::config::ParseConfig;
use super::scanner::{ScanContext, scan_segment};
use super::word::{OutStream, SegmentReport, SegmentState, SegmentStreams};

/// What a completed scan of the whole text produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub file_len: u64,
    /// One report per segment, in range order.
    pub segments: Vec<SegmentReport>,
}

impl ScanOutcome {
    pub fn words(&self) -> u64 {
        self.segments.iter().map(|s| s.words).sum()
    }
}

/// Number of segments actually used for a text of `len` bytes.
///
/// Every segment but the first must start past offset 0, so there are never
/// more segments than bytes.
pub fn effective_threads(len: u64, requested: usize) -> usize {
    let cap = usize::try_from(len).unwrap_or(usize::MAX).max(1);
    requested.max(1).min(cap)
}

/// Split `[0, len)` into `n` contiguous ranges of `len / n` bytes; the last
/// one absorbs the remainder.
pub fn partition(len: u64, n: usize) -> Vec<Range<u64>> {
    let n = n.max(1) as u64;
    let chunk = len / n;
    (0..n)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == n { len } else { (i + 1) * chunk };
            start..end
        })
        .collect()
}

/// Open segment `index`'s private output files next to `base`.
pub fn open_segment_streams(
    base: &Path,
    index: usize,
    sa_info: bool,
) -> Result<SegmentStreams<BufWriter<File>>, PfpError> {
    let open = |ext: &str| -> Result<OutStream<BufWriter<File>>, PfpError> {
        let path = aux_path_num(base, ext, index);
        let out = create_output(&path).map_err(|e| PfpError::io("create", &path, e))?;
        Ok(OutStream::new(path, out))
    };
    Ok(SegmentStreams {
        parse: open(EXT_PARSE_OLD)?,
        last: open(EXT_LAST)?,
        sai: if sa_info { Some(open(EXT_SAI)?) } else { None },
    })
}

/// Verify that the segments together parsed every byte of the text exactly
/// once. Each segment but the first re-parses the `w`-byte window it
/// resynchronized on.
pub fn check_accounting(
    segments: &[SegmentReport],
    window: u64,
    file_len: u64,
) -> Result<(), PfpError> {
    let mut total = 0u64;
    for seg in segments {
        if seg.words == 0 {
            if seg.index == 0 {
                return Err(PfpError::Inconsistent(
                    "the first segment produced no words".into(),
                ));
            }
            continue;
        }
        if seg.index == 0 {
            if file_len > window && seg.parsed <= window {
                return Err(PfpError::Inconsistent(format!(
                    "first segment parsed {} bytes with window {}",
                    seg.parsed, window
                )));
            }
            total += seg.parsed;
        } else {
            if seg.parsed < window {
                return Err(PfpError::Inconsistent(format!(
                    "segment {} parsed {} bytes, less than its window {}",
                    seg.index, seg.parsed, window
                )));
            }
            total += seg.parsed - window;
        }
    }
    if total != file_len {
        return Err(PfpError::Inconsistent(format!(
            "parsed {} bytes but the input has {}",
            total, file_len
        )));
    }
    Ok(())
}

/// Scan `input` with one thread per segment, writing each segment's streams
/// to `<base>.<ext>.<i>` and counting words in `dict`.
///
/// Returns the per-segment counters after checking that they account for
/// every input byte.
pub fn process_file(
    input: &Path,
    base: &Path,
    config: &ParseConfig,
    dict: &ShardedDict,
) -> Result<ScanOutcome, PfpError> {
    config.validate()?;
    let file_len = file_size(input).map_err(|e| PfpError::io("open", input, e))?;

    let threads = effective_threads(file_len, config.threads);
    if threads < config.threads {
        warn!(
            requested = config.threads,
            used = threads,
            "input too small, reducing thread count"
        );
    }

    let mut states = Vec::with_capacity(threads);
    for (i, range) in partition(file_len, threads).into_iter().enumerate() {
        let streams = open_segment_streams(base, i, config.sa_info)?;
        states.push(SegmentState::new(i, range, streams));
    }

    let cancel = AtomicBool::new(false);
    let ctx = ScanContext {
        input,
        window: config.window,
        modulus: config.modulus,
        dict,
        cancel: &cancel,
    };

    let finished: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = states
            .into_iter()
            .map(|mut state| {
                let ctx = &ctx;
                s.spawn(move || {
                    let result = open_noatime(ctx.input)
                        .map_err(|e| PfpError::io("open", ctx.input, e))
                        .and_then(|file| scan_segment(file, &mut state, ctx));
                    if result.is_err() {
                        ctx.cancel.store(true, Ordering::Relaxed);
                    }
                    (state, result)
                })
            })
            .collect();

        // Joined in range order so reporting is deterministic.
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
            .collect()
    });

    let mut first_error = None;
    let mut segments = Vec::with_capacity(finished.len());
    for (state, result) in finished {
        let closed = state.close();
        let report = match (result, closed) {
            (Ok(()), Ok((report, _))) => report,
            (Err(e), _) | (Ok(()), Err(e)) => {
                if first_error.is_none() && !e.is_cancelled() {
                    first_error = Some(e);
                }
                continue;
            }
        };
        info!(
            segment = report.index,
            start = report.start,
            end = report.end,
            parsed = report.parsed,
            skipped = report.skipped,
            words = report.words,
            "segment done"
        );
        segments.push(report);
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    if segments.len() != threads {
        return Err(PfpError::Cancelled);
    }

    check_accounting(&segments, config.window as u64, file_len)?;
    Ok(ScanOutcome { file_len, segments })
}
