//! Luau Obfuscator
//!
//! Upload-time protection for Luau scripts served through `loadstring`.
//! The pipeline is a pure text transform; nothing is parsed.
//!
//! Stages, always applied in this order when enabled:
//! 1. Local identifier renaming (`local x` -> `local _0x1f2e3d4c`)
//! 2. Base64 payload encoding wrapped in a self-decoding loader
//! 3. Vanguard protection banner
//! 4. Syntax check bypass comment

mod banner;
mod payload;
mod rename;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use banner::{add_banner, Banner};
pub use payload::{
    decode_payload, encode_and_wrap, extract_payload, reveal, ALPHABET, CHUNK_WIDTH, LOADER_HEADER,
};
pub use rename::{rename_locals, IdentifierMap};

/// Protection options selected for one script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Rename declared locals
    pub var_rename: bool,
    /// Encode the script and wrap it in a loader
    #[serde(alias = "v3ClassA")]
    pub payload_encode: bool,
    /// Prepend the Vanguard banner
    #[serde(alias = "vanguard")]
    pub header_banner: bool,
    /// Prepend the syntax check bypass comment
    #[serde(alias = "bypassSyntax")]
    pub syntax_bypass_comment: bool,
}

impl TransformOptions {
    /// Every stage enabled
    pub const fn all() -> Self {
        Self {
            var_rename: true,
            payload_encode: true,
            header_banner: true,
            syntax_bypass_comment: true,
        }
    }

    /// True if at least one stage is enabled
    pub const fn any(&self) -> bool {
        self.var_rename || self.payload_encode || self.header_banner || self.syntax_bypass_comment
    }

    /// Names of the enabled stages, in pipeline order
    pub fn enabled_stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.var_rename {
            stages.push("var_rename");
        }
        if self.payload_encode {
            stages.push("payload_encode");
        }
        if self.header_banner {
            stages.push("header_banner");
        }
        if self.syntax_bypass_comment {
            stages.push("syntax_bypass_comment");
        }
        stages
    }
}

/// Result of obfuscating a script
#[derive(Debug, Clone)]
pub struct ObfuscationResult {
    /// The transformed source code
    pub source: String,
    /// Number of distinct locals renamed
    pub identifiers_renamed: usize,
    /// Whether the script was wrapped in a loader
    pub payload_encoded: bool,
    /// Number of banners prepended
    pub banners_applied: usize,
}

impl ObfuscationResult {
    pub fn total_transforms(&self) -> usize {
        self.identifiers_renamed + usize::from(self.payload_encoded) + self.banners_applied
    }

    /// Size of the transformed source in bytes
    pub fn size(&self) -> usize {
        self.source.len()
    }
}

/// Obfuscator instance with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct Obfuscator {
    options: TransformOptions,
}

impl Obfuscator {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Obfuscate a Luau source string using the OS random source for names
    pub fn obfuscate(&self, source: &str) -> ObfuscationResult {
        self.obfuscate_with_rng(source, &mut rand::rngs::OsRng)
    }

    /// Obfuscate with an explicit random source for generated names
    pub fn obfuscate_with_rng<R: RngCore + ?Sized>(
        &self,
        source: &str,
        rng: &mut R,
    ) -> ObfuscationResult {
        let mut result = source.to_string();
        let mut identifiers_renamed = 0;
        let mut banners_applied = 0;

        // 1. Rename locals
        if self.options.var_rename {
            let (renamed, map) = rename_locals(&result, rng);
            result = renamed;
            identifiers_renamed = map.len();
        }

        // 2. Encode and wrap
        if self.options.payload_encode {
            result = encode_and_wrap(&result, rng);
        }

        // 3. Banners, outermost last
        if self.options.header_banner {
            result = add_banner(&result, Banner::Vanguard);
            banners_applied += 1;
        }
        if self.options.syntax_bypass_comment {
            result = add_banner(&result, Banner::SyntaxBypass);
            banners_applied += 1;
        }

        ObfuscationResult {
            source: result,
            identifiers_renamed,
            payload_encoded: self.options.payload_encode,
            banners_applied,
        }
    }

    /// Obfuscate a Luau source file, returning the transformed content
    pub fn obfuscate_file(&self, path: &Path) -> Result<ObfuscationResult> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(self.obfuscate(&source))
    }
}

/// Apply every enabled stage to `source`
pub fn transform(source: &str, options: &TransformOptions) -> String {
    Obfuscator::new(*options).obfuscate(source).source
}

/// [`transform`] with an explicit random source
pub fn transform_with_rng<R: RngCore + ?Sized>(
    source: &str,
    options: &TransformOptions,
    rng: &mut R,
) -> String {
    Obfuscator::new(*options).obfuscate_with_rng(source, rng).source
}

/// Read a script from disk and transform it
pub fn transform_file(path: &Path, options: &TransformOptions) -> Result<String> {
    Ok(Obfuscator::new(*options).obfuscate_file(path)?.source)
}
