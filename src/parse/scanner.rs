//! Per-segment scanning.
//!
//! A segment `[start, end)` is scanned in two phases:
//!
//! 1. **Resynchronization.** Unless the segment starts the text, bytes are
//!    read and rolled into a fresh window until the window is full and its
//!    fingerprint is divisible by the modulus. Those bytes belong to the
//!    previous segment; the last `w` of them seed this segment's first word.
//!    If the read position reaches `end + w` first, the segment owns no
//!    boundary and emits nothing.
//! 2. **Scan.** Every byte extends the current word. A boundary closes the
//!    word once more than `w` bytes have been parsed. After each emission the
//!    segment stops as soon as it has consumed `end - start + w` bytes.
//!
//! The stop rule and the resync rule meet at the same place: segment `i`
//! stops at its first boundary at or past `end_i + w`, and segment `i + 1`
//! resynchronizes on its first full window ending at or past
//! `start_{i+1} + w`. Same offset, same window bytes, same fingerprint, so
//! every word is emitted exactly once.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use memchr::memchr3;

use crate::common::io::read_full;
use crate::dict::ShardedDict;
use crate::error::PfpError;
use crate::krhash::KrWindow;

use super::config::SENTINEL;
use super::word::SegmentState;

/// Input is read in chunks of this size.
const READ_BUF: usize = 256 * 1024;

/// Read-only context shared by all scanners of a run.
pub struct ScanContext<'a> {
    pub input: &'a Path,
    pub window: usize,
    pub modulus: u64,
    pub dict: &'a ShardedDict,
    /// Set by the first scanner that fails; the others give up at their next
    /// emission or chunk.
    pub cancel: &'a AtomicBool,
}

impl ScanContext<'_> {
    #[inline]
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Index of the first byte at or below the sentinel.
#[inline]
pub fn first_reserved(chunk: &[u8]) -> Option<usize> {
    const _: () = assert!(SENTINEL == 2);
    memchr3(0x00, 0x01, SENTINEL, chunk)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resync,
    Scan,
    Done,
}

struct Scanner<'s, 'c, W> {
    state: &'s mut SegmentState<W>,
    ctx: &'s ScanContext<'c>,
    krw: KrWindow,
    word: Vec<u8>,
    /// Ending offset + 1 of the last word emitted (0 before the first word of
    /// the text).
    pos: u64,
    phase: Phase,
}

impl<'s, 'c, W: Write> Scanner<'s, 'c, W> {
    fn new(state: &'s mut SegmentState<W>, ctx: &'s ScanContext<'c>) -> Self {
        state.skipped = 0;
        state.parsed = 0;
        state.words = 0;
        let mut word = Vec::with_capacity(ctx.window * 4);
        let phase = if state.start == 0 {
            // The text starts here: no window to reach, just the sentinel.
            word.push(SENTINEL);
            Phase::Scan
        } else {
            Phase::Resync
        };
        Scanner {
            state,
            ctx,
            krw: KrWindow::new(ctx.window),
            word,
            pos: 0,
            phase,
        }
    }

    /// Consume `bytes`, which hold no reserved values. Returns true once the
    /// segment is finished.
    fn feed(&mut self, bytes: &[u8]) -> Result<bool, PfpError> {
        let w = self.ctx.window as u64;
        let p = self.ctx.modulus;
        for &c in bytes {
            match self.phase {
                Phase::Resync => {
                    self.state.skipped += 1;
                    if self.state.start + self.state.skipped >= self.state.end + w {
                        self.phase = Phase::Done;
                        return Ok(true);
                    }
                    self.word.push(c);
                    if self.word.len() >= 2 * self.ctx.window {
                        self.word.drain(..self.ctx.window);
                    }
                    let fp = self.krw.add_byte(c);
                    if fp % p == 0 && self.state.skipped >= w {
                        // The window belongs to the first word, not to the
                        // skipped prefix.
                        self.state.parsed = w;
                        self.state.skipped -= w;
                        let excess = self.word.len() - self.ctx.window;
                        self.word.drain(..excess);
                        self.pos = self.state.start + self.state.skipped + w;
                        self.phase = Phase::Scan;
                    }
                }
                Phase::Scan => {
                    self.word.push(c);
                    let fp = self.krw.add_byte(c);
                    self.state.parsed += 1;
                    if fp % p == 0 && self.state.parsed > w {
                        if self.state.save_and_slide(
                            &mut self.word,
                            self.ctx.window,
                            &mut self.pos,
                            self.ctx.dict,
                        )? {
                            self.state.words += 1;
                        }
                        if self.state.start + self.state.skipped + self.state.parsed
                            >= self.state.end + w
                        {
                            self.phase = Phase::Done;
                            return Ok(true);
                        }
                        if self.ctx.cancelled() {
                            return Err(PfpError::Cancelled);
                        }
                    }
                }
                Phase::Done => return Ok(true),
            }
        }
        Ok(false)
    }

    /// End of input. A segment still scanning pads its word with `w`
    /// sentinels and emits it as the last word of the text.
    fn finish(mut self) -> Result<(), PfpError> {
        if self.phase != Phase::Scan {
            return Ok(());
        }
        self.word
            .extend(std::iter::repeat_n(SENTINEL, self.ctx.window));
        if self.state.save_and_slide(
            &mut self.word,
            self.ctx.window,
            &mut self.pos,
            self.ctx.dict,
        )? {
            self.state.words += 1;
        }
        self.phase = Phase::Done;
        Ok(())
    }
}

/// Scan the segment described by `state` from `input`, which must be the
/// whole text (it is positioned at `state.start` here).
pub fn scan_segment<R, W>(
    mut input: R,
    state: &mut SegmentState<W>,
    ctx: &ScanContext<'_>,
) -> Result<(), PfpError>
where
    R: Read + Seek,
    W: Write,
{
    tracing::debug!(
        segment = state.index,
        start = state.start,
        size = state.end - state.start,
        "scanning segment"
    );
    input
        .seek(SeekFrom::Start(state.start))
        .map_err(|e| PfpError::io("seek", ctx.input, e))?;

    let mut offset = state.start;
    let mut scanner = Scanner::new(state, ctx);
    let mut buf = vec![0u8; READ_BUF];
    loop {
        if ctx.cancelled() {
            return Err(PfpError::Cancelled);
        }
        let n = match read_full(&mut input, &mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PfpError::io("read", ctx.input, e)),
        };
        let chunk = &buf[..n];
        let valid = first_reserved(chunk).unwrap_or(n);
        if scanner.feed(&chunk[..valid])? {
            return Ok(());
        }
        if valid < n {
            return Err(PfpError::InvalidByte {
                offset: offset + valid as u64,
                byte: chunk[valid],
            });
        }
        offset += n as u64;
    }
    scanner.finish()
}
