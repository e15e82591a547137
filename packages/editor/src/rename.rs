//! Names for pasted duplicates.
//!
//! `Trim` becomes `Trim_001` and `Trim_009` becomes `Trim_010`. Counters are
//! padded to three digits.

use regex::Regex;
use std::sync::OnceLock;

fn counter_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(^.*)_(\d+$)").ok())
        .as_ref()
}

/// Name for a duplicate: continue a trailing `_NNN` counter or start at `_001`
pub fn next_name(name: &str) -> String {
    let captures = counter_pattern().and_then(|pattern| pattern.captures(name));
    if let Some(captures) = captures {
        let base = captures.get(1).map_or("", |m| m.as_str());
        if let Some(count) = captures.get(2).and_then(|m| m.as_str().parse::<u64>().ok()) {
            return format!("{}_{:03}", base, count + 1);
        }
    }
    format!("{}_001", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_counter() {
        assert_eq!(next_name("Preset"), "Preset_001");
        assert_eq!(next_name(""), "_001");
    }

    #[test]
    fn test_continues_counter() {
        assert_eq!(next_name("Preset_001"), "Preset_002");
        assert_eq!(next_name("Preset_009"), "Preset_010");
        assert_eq!(next_name("Preset_999"), "Preset_1000");
        assert_eq!(next_name("a_b_7"), "a_b_008");
    }

    #[test]
    fn test_trailing_text_is_not_a_counter() {
        assert_eq!(next_name("Preset_01a"), "Preset_01a_001");
    }
}
