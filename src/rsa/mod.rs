use std::error::Error;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use num::Integer;
use clap::Parser;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

pub mod config;
pub mod random;
pub mod prime_gen;
pub mod codec;
pub mod keys;

use config::*;
use keys::*;
use prime_gen::*;
use random::RandState;
use crate::log;

#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Generate,
    Encrypt,
    Decrypt,
    Test,
}

#[macro_export]
macro_rules! rsa_t {
    ($CONFIG: expr, $NAME: ident) => {
#[derive(Debug, Clone, Parser)]
pub struct $NAME {
    #[clap(short, long, value_parser, default_value = $CONFIG.mode.as_str(), help = "Run mode: generate, encrypt, decrypt, test")]
    pub mode: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.key.as_str(), help = "Key path, generate/detect `path.pub' and `path.priv'")]
    pub key: String,
    #[clap(short, long, value_parser, env = "USER", default_value = $CONFIG.user.as_str(), help = "Username signed into the public key")]
    pub user: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.input.as_str(), help = "Input filename")]
    pub input: String,
    #[clap(short, long, value_parser, default_value = $CONFIG.output.as_str(), help = "Output filename")]
    pub output: String,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.bits, help = "Minimum bits of modulus n")]
    pub bits: u64,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.rounds, help = "Miller Rabin iterations for testing primes")]
    pub rounds: u64,
    #[clap(long, value_parser, help = "Random seed, current time when absent")]
    pub seed: Option<u64>,
    #[clap(long, value_parser, default_value_t = $CONFIG.tries, help = "Give up a random search after <TRIES> candidates")]
    pub tries: u64,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.silent, help = "Disable log output")]
    pub silent: bool,
    #[clap(short, long, value_parser, default_value_t = $CONFIG.threads, help = "Calculate in <THREADS> threads")]
    pub threads: usize,
}
    };
}

rsa_t!(CONFIG_DEF, RSA);

impl RSA {
    pub fn reader(&self) -> io::Result<Box<dyn Read>> {
        Ok(match self.input.as_str() {
            "stdin" => Box::new(io::stdin()),
            f => Box::new(File::open(f)?),
        })
    }

    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self.output.as_str() {
            "stdout" => Box::new(io::stdout()),
            f => Box::new(File::create(f)?),
        })
    }

    fn run_mode(&self) -> Result<RunMode, String> {
        match self.mode.as_str() {
            "encrypt" => Ok(RunMode::Encrypt),
            "decrypt" => Ok(RunMode::Decrypt),
            "generate" => Ok(RunMode::Generate),
            "test" => Ok(RunMode::Test),
            m => Err(format!("Unknown run mode {:?}! available: generate(default), encrypt, decrypt, test", m)),
        }
    }

    pub fn rand_state(&self) -> RandState {
        match self.seed {
            Some(seed) => RandState::new(seed),
            None => RandState::from_time(),
        }
    }

    pub fn euler(p: &BigInt, q: &BigInt) -> BigInt { (p - BigInt::one()) * (q - BigInt::one()) }

    pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
        let (mut a, mut b) = (a.clone(), b.clone());
        while !b.is_zero() {
            let r = a.mod_floor(&b);
            a = std::mem::replace(&mut b, r);
        }
        a
    }

    /// Inverse of `a` modulo `n` in `[0, n)`, or `None` when `gcd(a, n) > 1`.
    pub fn mod_inverse(a: &BigInt, n: &BigInt) -> Option<BigInt> {
        let (mut r, mut r1) = (n.clone(), a.clone());
        let (mut t, mut t1) = (BigInt::zero(), BigInt::one());
        while !r1.is_zero() {
            let q = r.div_floor(&r1);
            let r2 = &r - &q * &r1;
            r = std::mem::replace(&mut r1, r2);
            let t2 = &t - &q * &t1;
            t = std::mem::replace(&mut t1, t2);
        }
        if r > BigInt::one() {
            return None;
        }
        if t.is_negative() {
            t += n;
        }
        Some(t)
    }

    /// Splits `bits` between two primes, then samples `e` until it is
    /// coprime to phi(n). The primes are dropped on return.
    pub fn generate_key(&self, rng: &mut RandState) -> Result<KeySet, GenerateError> {
        let nbits = self.bits;
        if nbits < 16 {
            return Err(GenerateError::TooFewBits(nbits));
        }
        let pbits = rng.gen_range(nbits / 4, nbits / 4 + nbits / 2);
        let qbits = nbits - pbits;
        let p = RSA::generate_prime(pbits, self.rounds, self.tries, rng)?;
        let q = RSA::generate_prime(qbits, self.rounds, self.tries, rng)?;
        let n = &p * &q;
        let f = RSA::euler(&p, &q);
        let one = BigInt::one();
        let mut e = None;
        for _ in 0..self.tries {
            let candidate = rng.gen_bits(nbits);
            if candidate > one && candidate < f && RSA::gcd(&candidate, &f).is_one() {
                e = Some(candidate);
                break;
            }
        }
        let e = e.ok_or(GenerateError::Exhausted { what: "public exponent", tries: self.tries })?;
        let d = RSA::mod_inverse(&e, &f).ok_or(GenerateError::NoInverse)?;
        if !RSA::check_key_set(&d, &e, &f) {
            return Err(GenerateError::NoInverse);
        }
        log!("p ({} bits) = {}", p.bits(), p);
        log!("q ({} bits) = {}", q.bits(), q);
        log!("n ({} bits) = {}", n.bits(), n);
        log!("e ({} bits) = {}", e.bits(), e);
        log!("d ({} bits) = {}", d.bits(), d);
        Ok(KeySet { public: Key { base: e, m: n.clone() }, private: Key { base: d, m: n } })
    }

    pub fn check_key_set(d: &BigInt, e: &BigInt, f: &BigInt) -> bool {
        (d * e).mod_floor(f).is_one()
    }

    pub fn encrypt(m: &BigInt, key: &Key) -> BigInt {
        RSA::fast_modular_exponent(m, &key.base, &key.m)
    }

    pub fn decrypt(c: &BigInt, key: &Key) -> BigInt {
        RSA::fast_modular_exponent(c, &key.base, &key.m)
    }

    pub fn sign(m: &BigInt, key: &Key) -> BigInt {
        RSA::fast_modular_exponent(m, &key.base, &key.m)
    }

    /// Exact comparison of `s^e mod n` with `m`.
    pub fn verify(m: &BigInt, s: &BigInt, key: &Key) -> bool {
        RSA::fast_modular_exponent(s, &key.base, &key.m) == *m
    }

    fn run_generate(&self) -> Result<(), Box<dyn Error>> {
        let mut rng = self.rand_state();
        log!("random seed: {}", rng.seed());
        let key_set = self.generate_key(&mut rng)?;
        let m = username_to_bigint(&self.user)?;
        if m >= key_set.public.m {
            return Err(format!("username {:?} does not fit in a {}-bit modulus, raise --bits", self.user, self.bits).into());
        }
        let signature = RSA::sign(&m, &key_set.private);
        let key_pair = KeyPair {
            public: PublicKey::new(key_set.public, signature, self.user.clone()),
            private: PrivateKey::new(key_set.private),
        };
        key_pair.public.info();
        key_pair.private.info();
        key_pair.save(&self.key)?;
        log!("Generated key files: {}, {}", KeyPair::public_path(&self.key), KeyPair::private_path(&self.key));
        Ok(())
    }

    fn run_encrypt(&self) -> Result<(), Box<dyn Error>> {
        let public = PublicKey::load(KeyPair::public_path(&self.key))?;
        public.info();
        if !public.verify_user(&self.user)? {
            return Err(format!("signature cannot be verified for user {}", self.user).into());
        }
        let mut reader = self.reader()?;
        let mut writer = self.writer()?;
        codec::encrypt_stream(reader.as_mut(), writer.as_mut(), &public.key, self.threads)?;
        Ok(())
    }

    fn run_decrypt(&self) -> Result<(), Box<dyn Error>> {
        let private = PrivateKey::load(KeyPair::private_path(&self.key))?;
        private.info();
        let mut reader = self.reader()?;
        let mut writer = self.writer()?;
        codec::decrypt_stream(reader.as_mut(), writer.as_mut(), &private.key, self.threads)?;
        Ok(())
    }

    fn run_test(&self) -> Result<(), Box<dyn Error>> {
        let key_pair = KeyPair::load(&self.key)?;
        key_pair.public.info();
        key_pair.private.info();
        if key_pair.public.key.m != key_pair.private.key.m {
            return Err("public and private key moduli differ".into());
        }
        if !key_pair.public.verify_user(&self.user)? {
            return Err(format!("signature cannot be verified for user {}", self.user).into());
        }
        let sample = if self.input != "stdin" {
            let mut data = Vec::new();
            self.reader()?.read_to_end(&mut data)?;
            data
        } else {
            self.rand_state().gen_bytes(1000)
        };
        log!("start testing key pair on {} bytes", sample.len());
        let mut cipher = Vec::new();
        codec::encrypt_stream(&mut Cursor::new(sample.as_slice()), &mut cipher, &key_pair.public.key, self.threads)?;
        let mut plain = Vec::new();
        codec::decrypt_stream(&mut Cursor::new(cipher.as_slice()), &mut plain, &key_pair.private.key, self.threads)?;
        if plain != sample {
            return Err("decrypted sample differs from the original".into());
        }
        if self.output != "stdout" {
            self.writer()?.write_all(&cipher)?;
        }
        log!("Test pass");
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        match self.run_mode()? {
            RunMode::Generate => self.run_generate(),
            RunMode::Encrypt => self.run_encrypt(),
            RunMode::Decrypt => self.run_decrypt(),
            RunMode::Test => self.run_test(),
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_traits::One;
    use rstest::rstest;
    use crate::rsa::config::CONFIG_DEF;
    use crate::rsa::keys::Key;
    use crate::rsa::random::RandState;
    use crate::RSA;

    fn small_key_pair() -> (Key, Key) {
        // p = 17, q = 11, e = 7, d = 23
        let n = BigInt::from(187);
        (Key { base: BigInt::from(7), m: n.clone() }, Key { base: BigInt::from(23), m: n })
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(12, 0, 12)]
    #[case(0, 12, 12)]
    #[case(12, 18, 6)]
    #[case(17, 5, 1)]
    #[case(270, 192, 6)]
    fn gcd_cases(#[case] a: u64, #[case] b: u64, #[case] expected: u64) {
        assert_eq!(RSA::gcd(&BigInt::from(a), &BigInt::from(b)), BigInt::from(expected));
    }

    #[test]
    fn gcd_recurrence() {
        for a in 0u64..60 {
            for b in 1u64..60 {
                let (x, y) = (BigInt::from(a), BigInt::from(b));
                assert_eq!(RSA::gcd(&x, &y), RSA::gcd(&y, &(&x % &y)));
            }
        }
    }

    #[test]
    fn mod_inverse_of_coprime() {
        for n in 2u64..80 {
            for a in 1u64..n {
                let (a, n) = (BigInt::from(a), BigInt::from(n));
                match RSA::mod_inverse(&a, &n) {
                    Some(i) => {
                        assert!(RSA::gcd(&a, &n).is_one());
                        assert!(i >= BigInt::from(0) && i < n);
                        assert!(((&a * &i) % &n).is_one());
                    }
                    None => assert!(!RSA::gcd(&a, &n).is_one()),
                }
            }
        }
    }

    #[test]
    fn mod_inverse_reference() {
        assert_eq!(RSA::mod_inverse(&BigInt::from(3), &BigInt::from(7)), Some(BigInt::from(5)));
        assert_eq!(RSA::mod_inverse(&BigInt::from(7), &BigInt::from(160)), Some(BigInt::from(23)));
        assert_eq!(RSA::mod_inverse(&BigInt::from(6), &BigInt::from(9)), None);
    }

    #[test]
    fn textbook_encrypt_decrypt() {
        let (public, private) = small_key_pair();
        let m = BigInt::from(88);
        let c = RSA::encrypt(&m, &public);
        assert_eq!(c, BigInt::from(11));
        assert_eq!(RSA::decrypt(&c, &private), m);
    }

    #[test]
    fn generated_key_properties() {
        let mut r = CONFIG_DEF.clone();
        r.bits = 256;
        r.rounds = 20;
        for seed in 0..3 {
            let keys = r.generate_key(&mut RandState::new(seed)).unwrap();
            assert_eq!(keys.public.m, keys.private.m);
            assert!(keys.public.m.bits() >= 255);
            assert!(keys.public.base > BigInt::one());
            let m = BigInt::from(0x5eed_u32 + seed as u32);
            assert_eq!(RSA::decrypt(&RSA::encrypt(&m, &keys.public), &keys.private), m);
            assert_eq!(RSA::encrypt(&RSA::decrypt(&m, &keys.private), &keys.public), m);
        }
    }

    #[test]
    fn same_seed_same_keys() {
        let mut r = CONFIG_DEF.clone();
        r.bits = 128;
        r.rounds = 20;
        let a = r.generate_key(&mut RandState::new(42)).unwrap();
        let b = r.generate_key(&mut RandState::new(42)).unwrap();
        assert_eq!(a.public, b.public);
        assert_eq!(a.private, b.private);
    }

    #[test]
    fn too_few_bits() {
        let mut r = CONFIG_DEF.clone();
        r.bits = 8;
        assert!(r.generate_key(&mut RandState::new(1)).is_err());
    }

    #[test]
    fn sign_verify() {
        let mut r = CONFIG_DEF.clone();
        r.bits = 256;
        r.rounds = 20;
        let keys = r.generate_key(&mut RandState::new(7)).unwrap();
        let m = BigInt::from(123456789u64);
        let other = BigInt::from(987654321u64);
        let s = RSA::sign(&m, &keys.private);
        assert!(RSA::verify(&m, &s, &keys.public));
        assert!(!RSA::verify(&m, &RSA::sign(&other, &keys.private), &keys.public));
        assert!(!RSA::verify(&other, &s, &keys.public));
    }

    #[test]
    fn unknown_mode() {
        let mut r = CONFIG_DEF.clone();
        r.mode = "nope".to_string();
        assert!(r.run().is_err());
    }
}
