use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use chrono::Local;
use num::Integer;
use num_bigint::BigInt;
use num_traits::*;
use crate::log;
use crate::rsa::random::RandState;
use crate::RSA;

pub enum GenerateError {
    Exhausted { what: &'static str, tries: u64 },
    TooFewBits(u64),
    NoInverse,
}

impl GenerateError {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Exhausted { what, tries } =>
                write!(f, "Generation of {} exhausted after {} tries", what, tries),
            GenerateError::TooFewBits(bits) =>
                write!(f, "Modulus of {} bits is too small, use at least 16", bits),
            GenerateError::NoInverse =>
                write!(f, "Public exponent has no inverse modulo phi(n)"),
        }
    }
}

impl Display for GenerateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f)
    }
}

impl Debug for GenerateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f)
    }
}

impl Error for GenerateError {}

impl RSA {
    /// Square-and-multiply `base^exponent mod modulus`.
    pub fn fast_modular_exponent(base: &BigInt, exponent: &BigInt, modulus: &BigInt) -> BigInt {
        let mut v: BigInt = One::one();
        let mut p = base.mod_floor(modulus);
        let mut q = exponent.clone();
        while q.is_positive() {
            if q.is_odd() { v = (&v * &p).mod_floor(modulus); }
            p = (&p * &p).mod_floor(modulus);
            q >>= 1;
        }
        v
    }

    /// Miller-Rabin with `rounds` random witnesses drawn from `[2, n - 2]`.
    ///
    /// A composite slips through with probability at most `4^-rounds`.
    pub fn miller_rabin(n: &BigInt, rounds: u64, rng: &mut RandState) -> bool {
        let one: BigInt = One::one();
        let two = BigInt::from(2);
        if *n == two { return true; }
        if n.is_even() || *n <= one { return false; }
        if *n == BigInt::from(3) { return true; }
        let n_minus_one = n - &one;
        let mut r = n_minus_one.clone();
        let mut s: u64 = 0;
        while r.is_even() {
            r >>= 1;
            s += 1;
        }
        // witnesses span n - 3 values
        let span = n - BigInt::from(3);
        for _ in 0..rounds {
            let a = rng.gen_below(&span) + &two;
            let mut y = RSA::fast_modular_exponent(&a, &r, n);
            if y != one && y != n_minus_one {
                let mut j = 1;
                while j < s && y != n_minus_one {
                    y = RSA::fast_modular_exponent(&y, &two, n);
                    if y == one { return false; }
                    j += 1;
                }
                if y != n_minus_one { return false; }
            }
        }
        true
    }

    /// Draws `(bits + 2)`-bit candidates until one is at least `bits` long
    /// and passes Miller-Rabin. Gives up after `max_tries` candidates.
    pub fn generate_prime(bits: u64, rounds: u64, max_tries: u64, rng: &mut RandState) -> Result<BigInt, GenerateError> {
        let start = Local::now().timestamp_millis();
        for try_times in 1..=max_tries {
            let candidate = rng.gen_bits(bits + 2);
            if candidate.bits() >= bits && RSA::miller_rabin(&candidate, rounds, rng) {
                let time = Local::now().timestamp_millis() - start;
                log!("Done generation of {}-bit prime in {} tries after {} ms", candidate.bits(), try_times, time);
                return Ok(candidate);
            }
        }
        let time = Local::now().timestamp_millis() - start;
        log!("Failed generation in {} tries after {} ms", max_tries, time);
        Err(GenerateError::Exhausted { what: "prime", tries: max_tries })
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_traits::Num;
    use rstest::rstest;
    use crate::rsa::random::RandState;
    use crate::RSA;

    fn trial_division(n: u64) -> bool {
        n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
    }

    #[rstest]
    #[case(4, 13, 497, 445)]
    #[case(2, 10, 1000, 24)]
    #[case(7, 0, 13, 1)]
    #[case(0, 5, 13, 0)]
    #[case(123456789, 987654321, 1000000007, 652541198)]
    fn modular_exponent_matches_reference(#[case] b: u64, #[case] e: u64, #[case] m: u64, #[case] expected: u64) {
        let v = RSA::fast_modular_exponent(&BigInt::from(b), &BigInt::from(e), &BigInt::from(m));
        assert_eq!(v, BigInt::from(expected));
    }

    #[test]
    fn modular_exponent_against_pow() {
        for base in 0u64..20 {
            for exp in 0u32..12 {
                for m in 2u64..30 {
                    let expected = BigInt::from(base).pow(exp) % BigInt::from(m);
                    let v = RSA::fast_modular_exponent(&BigInt::from(base), &BigInt::from(exp), &BigInt::from(m));
                    assert_eq!(v, expected, "{}^{} mod {}", base, exp, m);
                }
            }
        }
    }

    #[test]
    fn miller_rabin_below_1000() {
        let mut rng = RandState::new(2022);
        for n in 0u64..1000 {
            assert_eq!(RSA::miller_rabin(&BigInt::from(n), 20, &mut rng), trial_division(n), "n = {}", n);
        }
    }

    #[rstest]
    #[case(3, true)]
    #[case(7, true)]
    #[case(11, true)]
    #[case(19, true)]
    #[case(43, true)]
    #[case(15, false)]
    #[case(27, false)]
    #[case(35, false)]
    #[case(91, false)]
    #[case(99, false)]
    fn miller_rabin_single_factor_of_two(#[case] n: u64, #[case] prime: bool) {
        // n - 1 = 2 * odd, so no squaring step runs
        assert_eq!((n - 1) % 4, 2);
        let mut rng = RandState::new(n);
        assert_eq!(RSA::miller_rabin(&BigInt::from(n), 20, &mut rng), prime);
    }

    #[rstest]
    #[case(561)]
    #[case(1105)]
    #[case(1729)]
    #[case(2465)]
    #[case(41041)]
    fn miller_rabin_rejects_carmichael(#[case] n: u64) {
        let mut rng = RandState::new(5);
        assert!(!RSA::miller_rabin(&BigInt::from(n), 20, &mut rng));
    }

    #[test]
    fn miller_rabin_large_prime() {
        // 2^127 - 1
        let p = BigInt::from_str_radix("170141183460469231731687303715884105727", 10).unwrap();
        let mut rng = RandState::new(1);
        assert!(RSA::miller_rabin(&p, 30, &mut rng));
        assert!(!RSA::miller_rabin(&(&p * BigInt::from(3)), 30, &mut rng));
    }

    #[test]
    fn generated_prime_has_requested_size() {
        let mut rng = RandState::new(17);
        for bits in [8u64, 32, 64, 128] {
            let p = RSA::generate_prime(bits, 20, 1_000_000, &mut rng).unwrap();
            assert!(p.bits() >= bits && p.bits() <= bits + 2);
            let mut check = RandState::new(3);
            assert!(RSA::miller_rabin(&p, 40, &mut check));
        }
    }

    #[test]
    fn generation_gives_up_after_cap() {
        let mut rng = RandState::new(17);
        assert!(RSA::generate_prime(512, 20, 0, &mut rng).is_err());
    }
}
