//! # Dead Codes
//!
//! When an individual code is redeemed its record is renamed to
//! `<code>_<suffix>`, where the suffix is 16 bytes from the operating
//! system's CSPRNG, hex-encoded. The dead value stays on the record for
//! audit purposes and can never be typed in by a customer.
//!
//! ```text
//!   SAVE10  ──►  SAVE10_3f9c0e51a7d24b8890e1c4f7a2b65d03
//!                └code┘ └──────── 32 hex chars ─────────┘
//! ```

use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per suffix.
pub const DEAD_CODE_SUFFIX_BYTES: usize = 16;

/// Hex characters per suffix.
pub const DEAD_CODE_SUFFIX_LEN: usize = DEAD_CODE_SUFFIX_BYTES * 2;

/// Generates a suffix from the given RNG.
pub fn random_suffix_with<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; DEAD_CODE_SUFFIX_BYTES];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates a suffix from the OS CSPRNG.
pub fn random_suffix() -> String {
    random_suffix_with(&mut OsRng)
}

/// Builds the dead value for a consumed code.
pub fn dead_code(code: &str) -> String {
    format!("{code}_{}", random_suffix())
}

/// Returns true if `candidate` is a dead value produced for `code`.
pub fn is_dead_code_of(candidate: &str, code: &str) -> bool {
    candidate
        .strip_prefix(code)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| {
            suffix.len() == DEAD_CODE_SUFFIX_LEN
                && suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}
