use num_bigint::BigInt;
use crate::rsa::keys::*;

/// `(n, e)` plus the owner's signed username.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    pub key: Key,
    pub signature: BigInt,
    pub username: String,
}

/// `(n, d)`. The primes are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateKey {
    pub key: Key,
}

impl PublicKey {
    pub fn new(key: Key, signature: BigInt, username: String) -> Self {
        Self { key, signature, username }
    }

    /// Checks that `user` is the one who signed this key.
    pub fn verify_user(&self, user: &str) -> Result<bool, KeyError> {
        let m = username_to_bigint(user)?;
        Ok(crate::RSA::verify(&m, &self.signature, &self.key))
    }

    pub fn info(&self) {
        crate::log!("public key of {}, n: {} bits, e: {} bits, s: {} bits",
            self.username, self.key.m.bits(), self.key.base.bits(), self.signature.bits());
    }
}

impl PrivateKey {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    pub fn info(&self) {
        crate::log!("private key, n: {} bits, d: {} bits", self.key.m.bits(), self.key.base.bits());
    }
}
