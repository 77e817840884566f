//! Rails-style inflection helpers.
//!
//! Only the rules the pipeline actually exercises are carried: `camelize`
//! and `underscore` convert between controller class names and file paths,
//! and `singularize` builds nested-resource parameter names
//! (`posts` → `post_id`).

use regex::Regex;
use std::sync::OnceLock;

/// Words whose singular and plural forms are identical.
const UNCOUNTABLE: &[&str] = &[
    "equipment", "information", "money", "species", "series", "fish", "sheep", "data", "feedback",
    "status", "metadata",
];

/// Irregular plural → singular pairs.
const IRREGULARS: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("media", "medium"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
];

fn singular_rules() -> &'static Vec<(Regex, &'static str)> {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(quiz)zes$", "${1}"),
            (r"(matr)ices$", "${1}ix"),
            (r"(vert|append)ices$", "${1}ix"),
            (r"(alias|status)es$", "${1}"),
            (r"(cris|ax|test)es$", "${1}is"),
            (r"(bus)es$", "${1}"),
            (r"(o)es$", "${1}"),
            (r"(x|ch|ss|sh)es$", "${1}"),
            (r"(m)ovies$", "${1}ovie"),
            (r"([^aeiouy]|qu)ies$", "${1}y"),
            (r"([lr])ves$", "${1}f"),
            (r"(hive)s$", "${1}"),
            (r"([^f])ves$", "${1}fe"),
            (r"([ti])a$", "${1}um"),
            (r"(n)ews$", "${1}ews"),
            (r"s$", ""),
        ]
        .iter()
        .map(|(pat, rep)| (Regex::new(pat).expect("singular rule"), *rep))
        .collect()
    })
}

/// Singularize a word using Rails-like inflection rules.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return word.to_string();
    }
    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, singular)) = IRREGULARS.iter().find(|(plural, _)| *plural == lower) {
        return (*singular).to_string();
    }
    for (pattern, replacement) in singular_rules() {
        if pattern.is_match(word) {
            return pattern.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}

/// Convert `snake_case` (optionally `/`-separated) to `Camel::Case`.
///
/// `api/v1/users` becomes `Api::V1::Users`.
pub fn camelize(snake: &str) -> String {
    snake
        .split('/')
        .map(|part| {
            part.split('_')
                .map(capitalize)
                .collect::<Vec<_>>()
                .concat()
        })
        .collect::<Vec<_>>()
        .join("::")
}

/// Convert `Camel::Case` to `snake/case` (Rails-style underscore).
pub fn underscore(camel: &str) -> String {
    static ACRONYM: OnceLock<Regex> = OnceLock::new();
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    let acronym = ACRONYM.get_or_init(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("acronym"));
    let boundary = BOUNDARY.get_or_init(|| Regex::new(r"([a-z\d])([A-Z])").expect("boundary"));

    let s = camel.replace("::", "/");
    let s = acronym.replace_all(&s, "${1}_${2}");
    let s = boundary.replace_all(&s, "${1}_${2}");
    s.replace('-', "_").to_ascii_lowercase()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelize_simple() {
        assert_eq!(camelize("users"), "Users");
        assert_eq!(camelize("user_profiles"), "UserProfiles");
    }

    #[test]
    fn test_camelize_with_slashes() {
        assert_eq!(camelize("api/v1/users"), "Api::V1::Users");
    }

    #[test]
    fn test_underscore_simple() {
        assert_eq!(underscore("UsersController"), "users_controller");
        assert_eq!(underscore("APIKey"), "api_key");
    }

    #[test]
    fn test_underscore_with_modules() {
        assert_eq!(
            underscore("Api::V1::UsersController"),
            "api/v1/users_controller"
        );
    }

    #[test]
    fn test_camelize_underscore_round_trip() {
        for name in ["api/v1/users", "admin/reports", "webhooks"] {
            assert_eq!(underscore(&camelize(name)), name);
        }
    }

    #[test]
    fn test_singularize_regular() {
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("comments"), "comment");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
    }

    #[test]
    fn test_singularize_irregular() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
    }

    #[test]
    fn test_singularize_uncountable() {
        assert_eq!(singularize("series"), "series");
        assert_eq!(singularize("status"), "status");
    }
}
