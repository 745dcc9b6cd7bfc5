use chrono::Local;
use num_bigint::{BigInt, RandBigInt};
use num_traits::Zero;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random source handed by `&mut` to everything that draws randomness.
///
/// The same seed always yields the same stream, which is what makes key
/// generation reproducible. The state is not synchronized: sharing one
/// instance between threads would need external locking, and two instances
/// seeded independently must not be interleaved within one run.
#[derive(Debug, Clone)]
pub struct RandState {
    rng: StdRng,
    seed: u64,
}

impl RandState {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), seed }
    }

    /// Seeded from the current Unix time in seconds.
    pub fn from_time() -> Self {
        Self::new(Local::now().timestamp() as u64)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform in `[0, 2^bits)`.
    pub fn gen_bits(&mut self, bits: u64) -> BigInt {
        BigInt::from(self.rng.gen_biguint(bits))
    }

    /// Uniform in `[0, bound)`; zero when `bound` is not positive.
    pub fn gen_below(&mut self, bound: &BigInt) -> BigInt {
        if *bound <= BigInt::zero() {
            return BigInt::zero();
        }
        self.rng.gen_bigint_range(&BigInt::zero(), bound)
    }

    /// Uniform in `[low, high)`.
    pub fn gen_range(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    pub fn gen_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.rng.fill(buf.as_mut_slice());
        buf
    }
}
