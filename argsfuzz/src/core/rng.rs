//! The single seeded random stream shared by every pipeline stage.
//!
//! Reproducibility depends on two things: one generator per run, and every
//! draw happening against a canonically ordered candidate list.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random source used across solving, value synthesis, and mutation.
pub type FuzzRng = ChaCha8Rng;

/// Build the run's random stream from a seed.
pub fn seeded(seed: u64) -> FuzzRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draw a fresh seed from the operating system.
pub fn entropy_seed() -> u64 {
    rand::rngs::OsRng.next_u64()
}

/// Bernoulli trial: true with probability `p`.
///
/// `p <= 0` never succeeds and `p >= 1` always does; one draw is consumed
/// either way.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.r#gen::<f64>() < p
}

/// Uniform choice from an already-sorted slice.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, sorted: &'a [T]) -> Option<&'a T> {
    sorted.choose(rng)
}
