//! Random password generation.

use rand::{rngs::OsRng, Rng};
use zeroize::Zeroizing;

/// Produces a fresh password of the requested length.
pub trait PasswordGenerator {
    fn generate(&self, length: usize) -> Zeroizing<String>;
}

/// Uniform draw from the 94 printable, non-space ASCII characters using the
/// OS CSPRNG.
pub struct OsRngGenerator;

impl PasswordGenerator for OsRngGenerator {
    fn generate(&self, length: usize) -> Zeroizing<String> {
        Zeroizing::new(
            (0..length)
                .map(|_| char::from(OsRng.gen_range(b'!'..=b'~')))
                .collect(),
        )
    }
}
