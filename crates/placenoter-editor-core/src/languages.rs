//! Code-block languages: registered names, aliases and display labels.

/// Registered language names with the grammar that tokenizes them.
///
/// Several languages borrow a close grammar when none is bundled.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("arduino", "C++"),
    ("bash", "Bourne Again Shell (bash)"),
    ("c", "C"),
    ("cpp", "C++"),
    ("csharp", "C#"),
    ("css", "CSS"),
    ("diff", "Diff"),
    ("go", "Go"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("json", "JSON"),
    ("kotlin", "Java"),
    ("less", "CSS"),
    ("lua", "Lua"),
    ("makefile", "Makefile"),
    ("markdown", "Markdown"),
    ("objectivec", "Objective-C"),
    ("perl", "Perl"),
    ("php", "PHP"),
    ("plaintext", "Plain Text"),
    ("python", "Python"),
    ("r", "R"),
    ("ruby", "Ruby"),
    ("rust", "Rust"),
    ("scss", "CSS"),
    ("shell", "Bourne Again Shell (bash)"),
    ("sql", "SQL"),
    ("typescript", "JavaScript"),
    ("xml", "XML"),
    ("yaml", "YAML"),
];

/// Alias to registered name.
pub const ALIASES: &[(&str, &str)] = &[
    ("ard", "arduino"),
    ("c++", "cpp"),
    ("c#", "csharp"),
    ("js", "javascript"),
    ("kot", "kotlin"),
    ("make", "makefile"),
    ("mk", "makefile"),
    ("md", "markdown"),
    ("objc", "objectivec"),
    ("py", "python"),
    ("ts", "typescript"),
];

pub fn is_registered(name: &str) -> bool {
    LANGUAGES.iter().any(|(n, _)| *n == name)
}

/// Registered name for a language or alias, case-insensitively.
pub fn resolve(language: &str) -> Option<&'static str> {
    let lower = language.trim().to_lowercase();
    if let Some((name, _)) = LANGUAGES.iter().find(|(n, _)| *n == lower) {
        return Some(name);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, name)| *name)
}

/// Grammar name for a registered language.
pub fn grammar_for(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, grammar)| *grammar)
}

/// Label shown in the code-block language picker.
///
/// `None` is "auto"; an alias also shows the language it stands for.
pub fn display_label(language: Option<&str>) -> String {
    let Some(language) = language.filter(|l| !l.is_empty()) else {
        return "auto".to_string();
    };
    match ALIASES.iter().find(|(alias, _)| *alias == language) {
        Some((_, main)) => format!("{language} - {main}"),
        None => language.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases_and_case() {
        assert_eq!(resolve("ts"), Some("typescript"));
        assert_eq!(resolve("PY"), Some("python"));
        assert_eq!(resolve("c++"), Some("cpp"));
        assert_eq!(resolve("mk"), Some("makefile"));
        assert_eq!(resolve("Rust"), Some("rust"));
        assert_eq!(resolve("brainfudge"), None);
    }

    #[test]
    fn test_every_alias_targets_a_registered_language() {
        for (_, name) in ALIASES {
            assert!(is_registered(name), "{name}");
        }
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label(None), "auto");
        assert_eq!(display_label(Some("ts")), "ts - typescript");
        assert_eq!(display_label(Some("rust")), "rust");
    }

    #[test]
    fn test_fallback_grammars() {
        assert_eq!(grammar_for("typescript"), Some("JavaScript"));
        assert_eq!(grammar_for("arduino"), Some("C++"));
        assert_eq!(grammar_for("kotlin"), Some("Java"));
    }
}
