use crate::rsa::keys::KeyError;
use crate::rsa::keys::key_data::*;

#[derive(Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    pub fn public_path(path: &str) -> String {
        path.to_string() + ".pub"
    }

    pub fn private_path(path: &str) -> String {
        path.to_string() + ".priv"
    }

    /// Reads `<path>.pub` and `<path>.priv`.
    pub fn load(path: &str) -> Result<Self, KeyError> {
        Ok(Self {
            public: PublicKey::load(KeyPair::public_path(path))?,
            private: PrivateKey::load(KeyPair::private_path(path))?,
        })
    }

    pub fn save(&self, path: &str) -> Result<(), KeyError> {
        self.public.save(KeyPair::public_path(path))?;
        self.private.save(KeyPair::private_path(path))?;
        Ok(())
    }
}
