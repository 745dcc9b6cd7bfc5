use lazy_static::lazy_static;
use mut_static::MutStatic;
use num_cpus;
use crate::RSA;

lazy_static! {
    pub static ref CONFIG_DEF: RSA = RSA {
        mode: String::from("generate"),
        key: String::from("rsa"),
        user: String::from("user"),
        input: String::from("stdin"),
        output: String::from("stdout"),
        bits: 256,
        rounds: 50,
        seed: None,
        tries: 1_000_000,
        silent: false,
        threads: num_cpus::get(),
    };
    pub static ref SILENT: MutStatic<bool> = MutStatic::from(false);
}

pub fn silent() -> bool {
    SILENT.read().map(|s| *s).unwrap_or(false)
}

pub fn set_silent(value: bool) {
    if let Ok(mut s) = SILENT.write() {
        *s = value;
    }
}

/// `println!` that respects the `--silent` flag.
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        if !$crate::rsa::config::silent() { println!($($arg)*); }
    };
}
