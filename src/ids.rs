use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Length of generated ids, in hex characters.
const ID_LEN: usize = 10;

/// Hands out short opaque tokens for line items and customers.
///
/// Each token is a truncated SHA-256 of a per-generator seed and a
/// monotonic counter, so two generators started at different instants
/// do not share a sequence.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: i128,
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_seed(OffsetDateTime::now_utc().unix_timestamp_nanos())
    }

    pub fn with_seed(seed: i128) -> Self {
        Self { seed, counter: 0 }
    }

    /// Produce the next token that `taken` does not already claim.
    pub fn next_free(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.next_raw();
            if !taken(&id) {
                return id;
            }
        }
    }

    fn next_raw(&mut self) -> String {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.counter.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..ID_LEN].to_string()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
