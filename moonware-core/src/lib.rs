//! Moonware Core Library
//!
//! This crate provides the script transformation pipeline for Moonware:
//! - Local identifier renaming
//! - Base64 payload encoding with a self-decoding Luau loader
//! - Protection banners
//! - Generated `_0x` identifiers and script ids

pub mod names;
pub mod obfuscator;

// Re-export commonly used types
pub use names::{generate_identifier, generate_script_id, is_generated_identifier, IDENTIFIER_PREFIX};
pub use obfuscator::{
    add_banner, decode_payload, encode_and_wrap, extract_payload, rename_locals, reveal,
    transform, transform_file, transform_with_rng, Banner, IdentifierMap, ObfuscationResult,
    Obfuscator, TransformOptions, LOADER_HEADER,
};
