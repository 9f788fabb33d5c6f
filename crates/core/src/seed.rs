//! Seed selection: a fixed designer seed, fresh runtime entropy, and the
//! seeds handed to retried attempts.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

use crate::random::RandomStream;
use crate::settings::GeneratorSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedChoice {
    Fixed(u64),
    Generated(u64),
}

impl SeedChoice {
    /// A fixed seed wins unless `randomize` is set.
    pub fn resolve(fixed: Option<u64>, randomize: bool) -> Self {
        match fixed {
            Some(seed) if !randomize => Self::Fixed(seed),
            _ => Self::Generated(runtime_seed()),
        }
    }

    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        let choice = Self::resolve(settings.seed, settings.randomize_seed);
        if let Self::Generated(seed) = choice {
            log::info!("using generated seed {seed}");
        }
        choice
    }

    pub fn value(self) -> u64 {
        match self {
            Self::Fixed(seed) | Self::Generated(seed) => seed,
        }
    }
}

static RUNTIME_SEED_CALLS: AtomicU64 = AtomicU64::new(0);

/// Hashes wall-clock time, the process id and a call counter.
pub fn runtime_seed() -> u64 {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |since| since.as_nanos());
    let calls = RUNTIME_SEED_CALLS.fetch_add(1, Ordering::Relaxed);

    let mut entropy = [0_u8; 28];
    entropy[..16].copy_from_slice(&nanos.to_le_bytes());
    entropy[16..20].copy_from_slice(&process::id().to_le_bytes());
    entropy[20..].copy_from_slice(&calls.to_le_bytes());
    xxh3_64(&entropy)
}

/// Seed for the attempt after `failed_attempt`, drawn from the failed
/// attempt's stream so the whole retry chain replays from the first seed.
pub(crate) fn retry_seed(failed: &mut RandomStream, failed_attempt: u32) -> u64 {
    xxh3_64_with_seed(&failed.derive_seed().to_le_bytes(), u64::from(failed_attempt))
}
