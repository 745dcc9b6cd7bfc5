mod rsa;

pub use crate::rsa::*;
pub use crate::rsa::config::set_silent;

use std::error::Error;
use clap::Parser;

fn main() -> Result<(), Box<dyn Error>> {
    let mut rsa = RSA::parse();
    if rsa.output == "stdout" && (rsa.mode == "encrypt" || rsa.mode == "decrypt") {
        rsa.silent = true;
    }
    set_silent(rsa.silent);
    crate::log!("Run args: {:?}", rsa);
    rsa.run()?;
    Ok(())
}
