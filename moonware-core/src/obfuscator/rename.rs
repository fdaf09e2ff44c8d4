//! Local identifier renaming
//!
//! Declaration sites are found with a plain regex (`local <name>`), not a
//! parser. Every whole-token occurrence of a declared name is then rewritten,
//! including occurrences inside string literals and comments.

use std::collections::HashMap;
use std::sync::OnceLock;

use rand::RngCore;
use regex::{Captures, Regex};

use crate::names::generate_identifier;

/// Luau reserved words; never treated as a declared name
const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"local\s+(?:function\s+)?([a-zA-Z_][a-zA-Z0-9_]*)")
            .expect("declaration pattern is valid")
    })
}

/// Maximal runs of ASCII word characters. A run equal to a declared name is
/// exactly an occurrence of that name bounded by ASCII word boundaries.
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9_]+").expect("token pattern is valid"))
}

/// Original name -> generated name, in order of first discovery
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    order: Vec<String>,
    names: HashMap<String, String>,
}

impl IdentifierMap {
    /// Scan `source` for declarations and assign each new name a generated one
    pub fn discover<R: RngCore + ?Sized>(source: &str, rng: &mut R) -> Self {
        let mut map = Self::default();
        for caps in declaration_regex().captures_iter(source) {
            let name = &caps[1];
            if KEYWORDS.contains(&name) || map.names.contains_key(name) {
                continue;
            }
            map.order.push(name.to_string());
            map.names.insert(name.to_string(), generate_identifier(rng));
        }
        map
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.names.get(original).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pairs of (original, generated) in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.names[name].as_str()))
    }

    /// Rewrite every whole-token occurrence of a mapped name
    pub fn apply(&self, source: &str) -> String {
        if self.is_empty() {
            return source.to_string();
        }
        token_regex()
            .replace_all(source, |caps: &Captures| {
                let token = &caps[0];
                self.get(token).unwrap_or(token).to_string()
            })
            .into_owned()
    }
}

/// Rename every declared local in `source`.
///
/// Returns the rewritten text and the map that was used; the map is only
/// informational and is not meant to be reused for another call.
pub fn rename_locals<R: RngCore + ?Sized>(source: &str, rng: &mut R) -> (String, IdentifierMap) {
    let map = IdentifierMap::discover(source, rng);
    let renamed = map.apply(source);
    (renamed, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::is_generated_identifier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    fn tokens(source: &str) -> Vec<&str> {
        token_regex().find_iter(source).map(|m| m.as_str()).collect()
    }

    #[test]
    fn test_rename_simple_local() {
        let (result, map) = rename_locals("local x = 1\nprint(x)", &mut rng());
        assert_eq!(map.len(), 1);
        let new_name = map.get("x").unwrap();
        assert!(is_generated_identifier(new_name));
        assert!(!tokens(&result).contains(&"x"));
        assert_eq!(result, format!("local {new_name} = 1\nprint({new_name})"));
    }

    #[test]
    fn test_no_partial_token_replacement() {
        let source = "local count = 0\nlocal counter = count + 1\nprint(my_count, counter)";
        let (result, map) = rename_locals(source, &mut rng());
        let count = map.get("count").unwrap();
        let counter = map.get("counter").unwrap();
        assert!(result.contains("my_count"));
        assert!(result.contains(&format!("local {counter} = {count} + 1")));
        assert!(!tokens(&result).contains(&"count"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let source = "local a = 1\nlocal a = 2\nreturn a";
        let (result, map) = rename_locals(source, &mut rng());
        assert_eq!(map.len(), 1);
        let a = map.get("a").unwrap();
        assert_eq!(result.matches(a).count(), 3);
    }

    #[test]
    fn test_discovery_order_is_preserved() {
        let source = "local zeta = 1\nlocal alpha = 2\nlocal mid = 3";
        let map = IdentifierMap::discover(source, &mut rng());
        let order: Vec<&str> = map.iter().map(|(original, _)| original).collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_local_function_renames_name_not_keyword() {
        let source = "local function greet(name)\n    print(name)\nend\ngreet(\"bob\")";
        let (result, map) = rename_locals(source, &mut rng());
        assert!(map.get("function").is_none());
        let greet = map.get("greet").unwrap();
        assert!(result.starts_with(&format!("local function {greet}(name)")));
        assert!(result.ends_with(&format!("{greet}(\"bob\")")));
    }

    #[test]
    fn test_identifier_starting_with_function_is_captured() {
        let (result, map) = rename_locals("local functionName = 1", &mut rng());
        assert!(map.get("functionName").is_some());
        assert!(!result.contains("functionName"));
    }

    #[test]
    fn test_only_first_name_in_list_is_renamed() {
        let (result, map) = rename_locals("local a, b = 1, 2\nprint(a, b)", &mut rng());
        assert_eq!(map.len(), 1);
        assert!(result.contains(", b = 1, 2"));
        assert!(result.ends_with(", b)"));
    }

    #[test]
    fn test_string_contents_are_rewritten_too() {
        let (result, map) = rename_locals("local msg = 1\nprint(\"msg\")", &mut rng());
        let msg = map.get("msg").unwrap();
        assert!(result.contains(&format!("\"{msg}\"")));
    }

    #[test]
    fn test_no_declarations_returns_input() {
        let source = "print('hello world')";
        let (result, map) = rename_locals(source, &mut rng());
        assert!(map.is_empty());
        assert_eq!(result, source);
    }

    #[test]
    fn test_empty_source() {
        let (result, map) = rename_locals("", &mut rng());
        assert!(map.is_empty());
        assert_eq!(result, "");
    }

    #[test]
    fn test_every_position_is_substituted() {
        let source = "local v = 1\nv = v + 1\nif v > 1 then print(v) end";
        let (result, map) = rename_locals(source, &mut rng());
        let v = map.get("v").unwrap();
        assert_eq!(result.matches(v).count(), 5);
        assert_eq!(result, source.replace('v', v));
    }

    #[test]
    fn test_non_ascii_neighbours() {
        let (result, map) = rename_locals("local x = 1\n-- éx x", &mut rng());
        let x = map.get("x").unwrap();
        assert!(result.ends_with(&format!("-- é{x} {x}")));
    }
}
