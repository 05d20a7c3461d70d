//! Shortcode generation and format validation

use rand::RngExt;

/// Symbols a shortcode may contain
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated codes before any widening
pub const DEFAULT_LENGTH: usize = 6;

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 10;

/// Produces candidate shortcodes. Output is not checked for collisions here;
/// the store retries until it finds a free code.
pub trait ShortcodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Uniform random codes over [`ALPHABET`]
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShortcodeGenerator;

impl ShortcodeGenerator for RandomShortcodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// True iff `code` matches `^[A-Za-z0-9]{3,10}$`
pub fn validate_format(code: &str) -> bool {
    (MIN_LENGTH..=MAX_LENGTH).contains(&code.len())
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
