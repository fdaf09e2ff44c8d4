//! Payload encoding and the self-decoding loader
//!
//! The whole script is base64-encoded and embedded in a Luau loader. The
//! loader carries its own base64 decoder, written with string patterns only
//! (no `bit32`), and hands the decoded text to `loadstring`.

use std::sync::OnceLock;

use base64::Engine;
use rand::RngCore;
use regex::Regex;

use crate::names::generate_identifier;

/// First line of every generated loader
pub const LOADER_HEADER: &str = "-- Moonware Obfuscator V3 Class-A";

/// Width of each string literal chunk in the generated loader
pub const CHUNK_WIDTH: usize = 80;

/// Base64 alphabet, duplicated inside the generated decoder
pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const PADDING: char = '=';

/// Encode `source` and wrap it in a loader that decodes and runs it
pub fn encode_and_wrap<R: RngCore + ?Sized>(source: &str, rng: &mut R) -> String {
    let encoded = base64::prelude::BASE64_STANDARD.encode(source.as_bytes());
    let chunks = split_chunks(&encoded);

    let data_var = generate_identifier(rng);
    let func_var = generate_identifier(rng);
    let param_var = generate_identifier(rng);

    let mut data = format!("\"{}\"", chunks[0]);
    for chunk in &chunks[1..] {
        data.push_str("\n    ..\"");
        data.push_str(chunk);
        data.push('"');
    }

    format!(
        r#"{LOADER_HEADER}
-- Protected Script - Unauthorized redistribution prohibited

local {data_var} = {data}

local {func_var} = function({param_var})
    local _0xb = '{ALPHABET}'
    {param_var} = string.gsub({param_var}, '[^'.._0xb..'=]', '')
    return ({param_var}:gsub('.', function(_0xx)
        if _0xx == '=' then return '' end
        local _0xr, _0xf = '', (_0xb:find(_0xx) - 1)
        for _0xi = 6, 1, -1 do
            _0xr = _0xr .. (_0xf % 2^_0xi - _0xf % 2^(_0xi-1) > 0 and '1' or '0')
        end
        return _0xr
    end):gsub('%d%d%d?%d?%d?%d?%d?%d?', function(_0xx)
        if #_0xx ~= 8 then return '' end
        local _0xc = 0
        for _0xi = 1, 8 do
            _0xc = _0xc + (_0xx:sub(_0xi, _0xi) == '1' and 2^(8-_0xi) or 0)
        end
        return string.char(_0xc)
    end))
end

return loadstring({func_var}({data_var}))()"#
    )
}

/// Split an encoded payload into literal-sized chunks; never empty
fn split_chunks(encoded: &str) -> Vec<&str> {
    if encoded.is_empty() {
        return vec![""];
    }
    // base64 output is ASCII, so byte offsets are char boundaries
    (0..encoded.len())
        .step_by(CHUNK_WIDTH)
        .map(|start| &encoded[start..(start + CHUNK_WIDTH).min(encoded.len())])
        .collect()
}

/// Run the loader's decoding algorithm on `encoded`.
///
/// This mirrors the generated Luau step for step: foreign characters are
/// dropped, each symbol becomes six bits, and the bit string is regrouped
/// into bytes with any short trailing group discarded.
pub fn decode_payload(encoded: &str) -> Vec<u8> {
    let mut bits = String::with_capacity(encoded.len() * 6);
    for c in encoded.chars() {
        if c == PADDING {
            continue;
        }
        let Some(index) = ALPHABET.find(c) else {
            continue;
        };
        for shift in (0..6).rev() {
            bits.push(if (index >> shift) & 1 == 1 { '1' } else { '0' });
        }
    }

    bits.as_bytes()
        .chunks(8)
        .filter(|group| group.len() == 8)
        .map(|group| group.iter().fold(0u8, |byte, bit| (byte << 1) | (bit - b'0')))
        .collect()
}

fn data_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"local _0x[0-9a-f]{8} = "([A-Za-z0-9+/=]*)"((?:\s*\.\."[A-Za-z0-9+/=]*")*)"#)
            .expect("payload pattern is valid")
    })
}

fn chunk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([A-Za-z0-9+/=]*)""#).expect("chunk pattern is valid"))
}

/// Recover the encoded payload from a generated loader.
///
/// Banners in front of the loader are skipped. Returns `None` if `artifact`
/// does not contain a loader.
pub fn extract_payload(artifact: &str) -> Option<String> {
    let start = artifact.find(LOADER_HEADER)?;
    let caps = data_regex().captures(&artifact[start..])?;

    let mut encoded = caps[1].to_string();
    for chunk in chunk_regex().captures_iter(&caps[2]) {
        encoded.push_str(&chunk[1]);
    }
    Some(encoded)
}

/// Extract and decode the script embedded in a generated loader
pub fn reveal(artifact: &str) -> Option<String> {
    let encoded = extract_payload(artifact)?;
    String::from_utf8(decode_payload(&encoded)).ok()
}
