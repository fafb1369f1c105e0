use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").unwrap());

/// Display name with non-word characters stripped, used for mention
/// matching.
pub fn safe_name(name: &str) -> String {
    NON_WORD.replace_all(name, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_strips_non_word() {
        assert_eq!(safe_name("Grace O'Malley"), "GraceOMalley");
        assert_eq!(safe_name("plain"), "plain");
        assert_eq!(safe_name("a b-c_d"), "abc_d");
    }
}
