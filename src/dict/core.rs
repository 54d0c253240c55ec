use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::PfpError;

/// Occurrence counter of a dictionary word. Written as a fixed-width `u32` to
/// the `.occ` file, so it must never wrap.
pub type Occ = u32;

/// Dictionary value: how often a word was seen and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordStats {
    pub occ: Occ,
    pub text: Vec<u8>,
}

/// Word-hash -> stats map split into independently locked shards.
///
/// A hash always lands in shard `hash % n`, so an update takes exactly one
/// lock and no thread ever holds two.
pub struct ShardedDict {
    shards: Vec<Mutex<HashMap<u64, WordStats>>>,
    max_occ: Occ,
}

impl ShardedDict {
    pub fn new(shards: usize, max_occ: Occ) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        ShardedDict { shards, max_occ }
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    pub fn shard_of(&self, hash: u64) -> usize {
        (hash % self.shards.len() as u64) as usize
    }

    /// A panicking scanner cannot leave a shard half-updated: every mutation
    /// below is a single insert or a single increment.
    fn lock(&self, shard: usize) -> MutexGuard<'_, HashMap<u64, WordStats>> {
        self.shards[shard]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one occurrence of `word`, whose full hash is `hash`.
    ///
    /// Fails if the count would pass the configured maximum, or if `hash` is
    /// already bound to a different text.
    pub fn update(&self, hash: u64, word: &[u8]) -> Result<(), PfpError> {
        let mut shard = self.lock(self.shard_of(hash));
        match shard.entry(hash) {
            Entry::Vacant(slot) => {
                slot.insert(WordStats {
                    occ: 1,
                    text: word.to_vec(),
                });
            }
            Entry::Occupied(mut slot) => {
                let stats = slot.get_mut();
                if stats.occ >= self.max_occ {
                    return Err(PfpError::OccurrenceOverflow {
                        hash,
                        max: self.max_occ,
                    });
                }
                stats.occ += 1;
                if stats.text != word {
                    return Err(PfpError::Collision {
                        hash,
                        stored: stats.text.clone(),
                        found: word.to_vec(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, hash: u64) -> Option<WordStats> {
        self.lock(self.shard_of(hash)).get(&hash).cloned()
    }

    /// Number of distinct words across all shards.
    pub fn len(&self) -> usize {
        (0..self.shards.len()).map(|i| self.lock(i).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain every shard into one unordered vector.
    pub fn into_entries(self) -> Vec<(u64, WordStats)> {
        let mut entries = Vec::new();
        for shard in self.shards {
            let map = shard.into_inner().unwrap_or_else(PoisonError::into_inner);
            entries.extend(map);
        }
        entries
    }
}
