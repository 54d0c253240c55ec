/// Alphabet size of both Karp-Rabin hashes.
const ASIZE: u64 = 256;

/// Prime modulus of the rolling window fingerprint.
pub const KR_WINDOW_PRIME: u64 = 1_999_999_973;

/// Prime modulus of the full-word hash. `ASIZE * (KR_WORD_PRIME - 1) + 255`
/// still fits in a u64.
pub const KR_WORD_PRIME: u64 = 27_162_335_252_586_509;

/// Karp-Rabin fingerprint of the last `size` bytes seen.
///
/// Two windows of the same size that have seen the same last `size` bytes
/// return the same fingerprint whatever came before, so scanners started at
/// different offsets agree on boundaries without talking to each other.
#[derive(Debug, Clone)]
pub struct KrWindow {
    window: Vec<u8>,
    /// `ASIZE^(size-1) mod KR_WINDOW_PRIME`, the weight of the oldest byte.
    oldest_weight: u64,
    hash: u64,
    /// Next slot of `window` to overwrite.
    next: usize,
    full: bool,
}

impl KrWindow {
    pub fn new(size: usize) -> Self {
        debug_assert!(size > 0, "window size must be positive");
        let size = size.max(1);
        let mut oldest_weight = 1u64;
        for _ in 1..size {
            oldest_weight = (oldest_weight * ASIZE) % KR_WINDOW_PRIME;
        }
        KrWindow {
            window: vec![0; size],
            oldest_weight,
            hash: 0,
            next: 0,
            full: false,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Push `c`, evicting the oldest byte once the window is full, and return
    /// the fingerprint of the (up to `size`-byte) window.
    #[inline]
    pub fn add_byte(&mut self, c: u8) -> u64 {
        if self.full {
            let out = self.window[self.next] as u64;
            self.hash += KR_WINDOW_PRIME - (out * self.oldest_weight) % KR_WINDOW_PRIME;
        }
        self.hash = (ASIZE * self.hash + c as u64) % KR_WINDOW_PRIME;
        self.window[self.next] = c;
        self.next += 1;
        if self.next == self.window.len() {
            self.next = 0;
            self.full = true;
        }
        self.hash
    }

    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.hash
    }
}

/// Full Karp-Rabin hash of a word; the dictionary key and the parse record.
#[inline]
pub fn kr_hash(word: &[u8]) -> u64 {
    word.iter()
        .fold(0u64, |h, &c| (ASIZE * h + c as u64) % KR_WORD_PRIME)
}
