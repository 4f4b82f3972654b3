//! Extension-based language classification.
//!
//! Pure and total: every path maps to exactly one [`Language`],
//! falling back to [`Language::Unknown`] for unrecognized extensions.
//! The extension table is supplied at construction so tests can
//! inject custom tables; the default table mirrors
//! [`Language::from_extension`].

use crate::core::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

static DEFAULT_EXTENSIONS: Lazy<HashMap<&'static str, Language>> = Lazy::new(|| {
    HashMap::from([
        ("py", Language::Python),
        ("pyw", Language::Python),
        ("pyi", Language::Python),
        ("js", Language::JavaScript),
        ("jsx", Language::JavaScript),
        ("mjs", Language::JavaScript),
        ("cjs", Language::JavaScript),
        ("ts", Language::TypeScript),
        ("tsx", Language::TypeScript),
        ("mts", Language::TypeScript),
        ("cts", Language::TypeScript),
        ("rs", Language::Rust),
        ("go", Language::Go),
        ("rb", Language::Ruby),
        ("rbw", Language::Ruby),
    ])
});

#[derive(Clone, Debug)]
pub struct LanguageClassifier {
    table: HashMap<String, Language>,
}

impl Default for LanguageClassifier {
    fn default() -> Self {
        Self::with_table(
            DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, lang)| (ext.to_string(), *lang)),
        )
    }
}

impl LanguageClassifier {
    /// Build a classifier from an explicit extension table. Keys are
    /// extensions without the dot; lookups are case-insensitive.
    pub fn with_table(table: impl IntoIterator<Item = (String, Language)>) -> Self {
        Self {
            table: table
                .into_iter()
                .map(|(ext, lang)| (ext.to_ascii_lowercase(), lang))
                .collect(),
        }
    }

    pub fn classify(&self, path: &Path) -> Language {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.table.get(ext.to_ascii_lowercase().as_str()))
            .copied()
            .unwrap_or(Language::Unknown)
    }

    pub fn known_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.table.values().copied().collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_table() {
        let classifier = LanguageClassifier::default();
        assert_eq!(
            classifier.classify(&PathBuf::from("src/main.py")),
            Language::Python
        );
        assert_eq!(
            classifier.classify(&PathBuf::from("web/App.TSX")),
            Language::TypeScript
        );
        assert_eq!(
            classifier.classify(&PathBuf::from("lib.rs")),
            Language::Rust
        );
    }

    #[test]
    fn test_unknown_extension() {
        let classifier = LanguageClassifier::default();
        assert_eq!(
            classifier.classify(&PathBuf::from("data.csv")),
            Language::Unknown
        );
        assert_eq!(
            classifier.classify(&PathBuf::from("Makefile")),
            Language::Unknown
        );
    }

    #[test]
    fn test_custom_table() {
        let classifier =
            LanguageClassifier::with_table([("weird".to_string(), Language::Python)]);
        assert_eq!(
            classifier.classify(&PathBuf::from("script.weird")),
            Language::Python
        );
        // Default mappings are absent from a custom table.
        assert_eq!(
            classifier.classify(&PathBuf::from("script.py")),
            Language::Unknown
        );
    }

    #[test]
    fn test_known_languages_deduped() {
        let classifier = LanguageClassifier::default();
        let languages = classifier.known_languages();
        let python_count = languages
            .iter()
            .filter(|l| **l == Language::Python)
            .count();
        assert_eq!(python_count, 1);
        assert!(!languages.contains(&Language::Unknown));
    }
}
