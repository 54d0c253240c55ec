use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;

use crate::dict::ShardedDict;
use crate::error::PfpError;
use crate::krhash::kr_hash;

use super::config::IBYTES;

/// An output stream that remembers where it goes, for error reporting.
pub struct OutStream<W> {
    path: PathBuf,
    inner: W,
}

impl<W: Write> OutStream<W> {
    pub fn new(path: impl Into<PathBuf>, inner: W) -> Self {
        OutStream {
            path: path.into(),
            inner,
        }
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<(), PfpError> {
        self.inner
            .write_all(bytes)
            .map_err(|e| PfpError::io("write", &self.path, e))
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W, PfpError> {
        self.inner
            .flush()
            .map_err(|e| PfpError::io("flush", &self.path, e))?;
        Ok(self.inner)
    }
}

/// The three private streams of one segment.
pub struct SegmentStreams<W> {
    /// Full hash of every word, 8 bytes native order.
    pub parse: OutStream<W>,
    /// The byte preceding each word's trailing window.
    pub last: OutStream<W>,
    /// Ending offset + 1 of every word, `IBYTES` little-endian bytes.
    pub sai: Option<OutStream<W>>,
}

/// Flushed writers of a finished segment.
#[derive(Debug)]
pub struct SegmentOutput<W> {
    pub parse: W,
    pub last: W,
    pub sai: Option<W>,
}

impl<W: Write> SegmentStreams<W> {
    pub fn finish(self) -> Result<SegmentOutput<W>, PfpError> {
        Ok(SegmentOutput {
            parse: self.parse.finish()?,
            last: self.last.finish()?,
            sai: self.sai.map(OutStream::finish).transpose()?,
        })
    }
}

/// Counters of one segment, kept after its streams are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentReport {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    /// Bytes read before the resynchronization boundary.
    pub skipped: u64,
    /// Bytes consumed as part of emitted words, the seed window included.
    pub parsed: u64,
    pub words: u64,
}

/// Everything one scanner thread owns: its byte range, its counters and its
/// output streams.
pub struct SegmentState<W> {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub skipped: u64,
    pub parsed: u64,
    pub words: u64,
    streams: SegmentStreams<W>,
}

impl<W: Write> SegmentState<W> {
    pub fn new(index: usize, range: Range<u64>, streams: SegmentStreams<W>) -> Self {
        SegmentState {
            index,
            start: range.start,
            end: range.end,
            skipped: 0,
            parsed: 0,
            words: 0,
            streams,
        }
    }

    pub fn report(&self) -> SegmentReport {
        SegmentReport {
            index: self.index,
            start: self.start,
            end: self.end,
            skipped: self.skipped,
            parsed: self.parsed,
            words: self.words,
        }
    }

    /// Close the streams, returning the final counters and the flushed writers.
    pub fn close(self) -> Result<(SegmentReport, SegmentOutput<W>), PfpError> {
        let report = self.report();
        Ok((report, self.streams.finish()?))
    }

    /// Emit the closed word `word` and keep only its trailing `w` bytes, the
    /// start of the next word.
    ///
    /// `pos` is the ending offset + 1 of the previous word in the text, or 0
    /// before the first word of the text. Returns false, emitting nothing, if
    /// the word is not longer than the window.
    pub fn save_and_slide(
        &mut self,
        word: &mut Vec<u8>,
        w: usize,
        pos: &mut u64,
        dict: &ShardedDict,
    ) -> Result<bool, PfpError> {
        debug_assert!(*pos == 0 || word.len() > w);
        if word.len() <= w {
            return Ok(false);
        }

        let hash = kr_hash(word);
        self.streams.parse.put(&hash.to_ne_bytes())?;
        dict.update(hash, word)?;
        self.streams.last.put(&[word[word.len() - w - 1]])?;

        if *pos == 0 {
            // -1 for the sentinel in front of the first word
            *pos = word.len() as u64 - 1;
        } else {
            *pos += (word.len() - w) as u64;
        }
        if let Some(sai) = self.streams.sai.as_mut() {
            sai.put(&pos.to_le_bytes()[..IBYTES])?;
        }

        word.drain(..word.len() - w);
        Ok(true)
    }
}
