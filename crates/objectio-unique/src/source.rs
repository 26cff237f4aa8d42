//! Candidate sources for random identifier allocation
//!
//! Candidates only need to be uniformly distributed over the masked width;
//! none of the sources here are meant to be unpredictable. The registry
//! calls the source with its lock released.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplies raw 64-bit candidates; the registry masks them
pub trait CandidateSource: Send + Sync {
    /// Draw the next unmasked candidate
    fn next_candidate(&self) -> u64;
}

impl<F> CandidateSource for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn next_candidate(&self) -> u64 {
        self()
    }
}

/// Draws from the calling thread's `rand::thread_rng()`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl CandidateSource for ThreadRngSource {
    fn next_candidate(&self) -> u64 {
        rand::thread_rng().r#gen()
    }
}

/// Reproducible source backed by a seeded `StdRng`
///
/// All callers share one generator, so the sequence is only reproducible
/// when a single thread draws from it.
#[derive(Debug)]
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    /// Create a source from a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl CandidateSource for SeededSource {
    fn next_candidate(&self) -> u64 {
        self.rng.lock().r#gen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_source_is_reproducible() {
        let a = SeededSource::new(7);
        let b = SeededSource::new(7);
        let first: Vec<u64> = (0..16).map(|_| a.next_candidate()).collect();
        let second: Vec<u64> = (0..16).map(|_| b.next_candidate()).collect();
        assert_eq!(first, second);

        let c = SeededSource::new(8);
        assert_ne!(first[0], c.next_candidate());
    }

    #[test]
    fn test_closure_source() {
        let source = || 0xfeed_u64;
        assert_eq!(source.next_candidate(), 0xfeed);
    }

    #[test]
    fn test_thread_rng_source_varies() {
        let source = ThreadRngSource;
        let draws: std::collections::HashSet<u64> =
            (0..64).map(|_| source.next_candidate()).collect();
        assert!(draws.len() > 1);
    }
}
