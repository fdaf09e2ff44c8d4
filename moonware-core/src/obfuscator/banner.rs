//! Protection banners prepended to the final artifact

/// Kind of banner to prepend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    /// Boxed "Vanguard" protection notice
    Vanguard,
    /// Single-line syntax check bypass marker
    SyntaxBypass,
}

const VANGUARD: &str = "\
-- ╔═══════════════════════════════════════╗
-- ║  Vanguard-WS v3.5 Protection Active  ║
-- ║  Anti-Decompiler • Anti-Tamper       ║
-- ║  Unauthorized Access Forbidden       ║
-- ╚═══════════════════════════════════════╝
--
-- This script is protected by Panda Vanguard
-- Tampering with this code will result in execution failure
-- Script integrity verified

";

const SYNTAX_BYPASS: &str = "-- [SYNTAX CHECK BYPASS ENABLED]\n";

impl Banner {
    /// Literal text prepended for this banner, trailing newlines included
    pub const fn text(self) -> &'static str {
        match self {
            Self::Vanguard => VANGUARD,
            Self::SyntaxBypass => SYNTAX_BYPASS,
        }
    }
}

/// Prepend `banner` to `source`
pub fn add_banner(source: &str, banner: Banner) -> String {
    let text = banner.text();
    let mut result = String::with_capacity(text.len() + source.len());
    result.push_str(text);
    result.push_str(source);
    result
}
