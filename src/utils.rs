use std::fmt::Debug;

use rand::{rngs::SmallRng, RngCore, SeedableRng};

/// The only source of randomness of a game.
///
/// Every roll advances it, so resolution must happen in the same order
/// on every participant that re-resolves actions.
#[derive(Clone, Debug)]
pub struct GameRng {
    seed: u64,
    rng: SmallRng,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for GameRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Remove an element from a vector.
pub fn try_remove_item<T: Debug + PartialEq>(vec: &mut Vec<T>, e: &T) -> bool {
    vec.iter()
        .position(|current| current == e)
        .map(|e| vec.remove(e))
        .is_some()
}

pub fn clamp_min<T: PartialOrd>(value: T, min: T) -> T {
    if value < min {
        min
    } else {
        value
    }
}
