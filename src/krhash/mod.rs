mod core;


pub use self::core::{KR_WINDOW_PRIME, KR_WORD_PRIME, KrWindow, kr_hash};
