//! Generated identifiers
//!
//! Every name the pipeline invents has the form `_0x` followed by eight
//! lowercase hex characters. Script ids handed out by the server are sixteen
//! hex characters with no prefix.

use rand::RngCore;

/// Prefix shared by every generated Luau identifier
pub const IDENTIFIER_PREFIX: &str = "_0x";

/// Random bytes behind an identifier suffix (8 hex characters)
const IDENTIFIER_BYTES: usize = 4;

/// Random bytes behind a script id (16 hex characters)
const SCRIPT_ID_BYTES: usize = 8;

/// Generate a fresh `_0x????????` identifier.
///
/// No uniqueness check is made; two calls may collide with probability
/// 2^-32 per pair.
pub fn generate_identifier<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; IDENTIFIER_BYTES];
    rng.fill_bytes(&mut bytes);
    format!("{}{}", IDENTIFIER_PREFIX, hex::encode(bytes))
}

/// Generate a storage key for an uploaded script
pub fn generate_script_id<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; SCRIPT_ID_BYTES];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// True if `name` has the shape produced by [`generate_identifier`]
pub fn is_generated_identifier(name: &str) -> bool {
    name.strip_prefix(IDENTIFIER_PREFIX)
        .map(|suffix| {
            suffix.len() == IDENTIFIER_BYTES * 2
                && suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
        .unwrap_or(false)
}
