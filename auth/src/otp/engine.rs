use rand::rngs::OsRng;
use rand::Rng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use super::errors::OtpCodeError;

/// Number of digits in a generated passcode.
pub const CODE_LENGTH: usize = 6;

const SALT_BYTES: usize = 16;

/// One-time-passcode primitives: generation, hashing, and verification.
///
/// The plaintext code exists only in the [`GeneratedCode`] returned to the
/// caller for delivery; storage gets the salted hash. Verification recomputes
/// the hash and compares in constant time.
pub struct OtpEngine;

/// A freshly generated passcode together with its storage material.
pub struct GeneratedCode {
    /// Plaintext 6-digit code, for delivery only
    pub code: String,
    /// Hex-encoded random per-code salt
    pub salt: String,
    /// Hex-encoded SHA-256 of code + salt
    pub hash: String,
}

impl OtpEngine {
    pub fn new() -> Self {
        Self
    }

    /// Generate a uniformly random 6-digit code with a fresh salt and hash.
    ///
    /// The code is drawn from the OS CSPRNG over the inclusive range
    /// 100000..=999999, so every value is equally likely (a reduction like
    /// `x % 1_000_000` would skew toward low codes).
    pub fn generate(&self) -> GeneratedCode {
        let code = OsRng.gen_range(100_000..=999_999u32).to_string();

        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = hex::encode(salt_bytes);

        let hash = self.hash(&code, &salt);

        GeneratedCode { code, salt, hash }
    }

    /// Hash a code with its salt for storage.
    pub fn hash(&self, code: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        hasher.update(salt.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify a submitted code against a stored hash and salt.
    ///
    /// Input is normalized first (see [`OtpEngine::normalize`]); the hash
    /// comparison is constant-time so partial matches leak nothing through
    /// timing.
    ///
    /// # Errors
    /// * `InvalidFormat` - Submitted value is not a 6-digit code
    pub fn verify(
        &self,
        submitted: &str,
        stored_hash: &str,
        stored_salt: &str,
    ) -> Result<bool, OtpCodeError> {
        let code = Self::normalize(submitted)?;
        let computed = self.hash(&code, stored_salt);
        Ok(constant_time_eq(&computed, stored_hash))
    }

    /// Normalize user input: trim, drop spaces and dashes, require 6 digits.
    ///
    /// Users paste codes as "123 456" or "123-456"; both must verify.
    pub fn normalize(submitted: &str) -> Result<String, OtpCodeError> {
        let cleaned: String = submitted
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if cleaned.len() == CODE_LENGTH && cleaned.chars().all(|c| c.is_ascii_digit()) {
            Ok(cleaned)
        } else {
            Err(OtpCodeError::InvalidFormat)
        }
    }
}

impl Default for OtpEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Constant-time string equality: XOR-folds every byte pair so the running
/// time does not depend on where the first mismatch sits.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_stay_in_range() {
        let engine = OtpEngine::new();

        for _ in 0..10_000 {
            let generated = engine.generate();
            let value: u32 = generated.code.parse().expect("code is numeric");
            assert!((100_000..=999_999).contains(&value));
            assert_eq!(generated.code.len(), CODE_LENGTH);
        }
    }

    #[test]
    fn test_generated_codes_cover_the_range() {
        // A biased generator (e.g. modulo reduction) would cluster low; a
        // uniform one over 900k values spreads across both halves quickly.
        let engine = OtpEngine::new();
        let mut low = 0u32;
        let mut high = 0u32;

        for _ in 0..1_000 {
            let value: u32 = engine.generate().code.parse().unwrap();
            if value < 550_000 {
                low += 1;
            } else {
                high += 1;
            }
        }

        assert!(low > 300, "low half underrepresented: {low}");
        assert!(high > 300, "high half underrepresented: {high}");
    }

    #[test]
    fn test_hash_round_trip() {
        let engine = OtpEngine::new();
        let generated = engine.generate();

        assert!(engine
            .verify(&generated.code, &generated.hash, &generated.salt)
            .unwrap());
    }

    #[test]
    fn test_wrong_code_fails() {
        let engine = OtpEngine::new();
        let generated = engine.generate();

        let wrong = if generated.code == "123456" {
            "654321"
        } else {
            "123456"
        };
        assert!(!engine.verify(wrong, &generated.hash, &generated.salt).unwrap());
    }

    #[test]
    fn test_salt_changes_hash() {
        let engine = OtpEngine::new();
        let a = engine.hash("123456", "salt_a");
        let b = engine.hash("123456", "salt_b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(OtpEngine::normalize(" 123 456 ").unwrap(), "123456");
        assert_eq!(OtpEngine::normalize("123-456").unwrap(), "123456");
        assert_eq!(OtpEngine::normalize("123456").unwrap(), "123456");
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert_eq!(OtpEngine::normalize("12345"), Err(OtpCodeError::InvalidFormat));
        assert_eq!(OtpEngine::normalize("1234567"), Err(OtpCodeError::InvalidFormat));
        assert_eq!(OtpEngine::normalize("12345a"), Err(OtpCodeError::InvalidFormat));
        assert_eq!(OtpEngine::normalize(""), Err(OtpCodeError::InvalidFormat));
    }

    #[test]
    fn test_verify_normalizes_before_hashing() {
        let engine = OtpEngine::new();
        let generated = engine.generate();
        let spaced = format!("{} {}", &generated.code[..3], &generated.code[3..]);

        assert!(engine.verify(&spaced, &generated.hash, &generated.salt).unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abcdef", "abcdef"));
        assert!(!constant_time_eq("abcdef", "abcdeg"));
        assert!(!constant_time_eq("abc", "abcdef"));
    }
}
