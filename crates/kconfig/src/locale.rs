//! Locale fallback chains for localized entries (`key[de_DE]=...`).

use std::env;

/// Ordered list of locale tags to try, most specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleChain {
    /// Tags in lookup order.
    tags: Vec<String>,
}

impl LocaleChain {
    /// Build the chain for `locale`, e.g. `de_DE.UTF-8` gives `["de_DE", "de"]`.
    ///
    /// `C` and `POSIX` behave like `en_US`. An empty locale gives an empty chain,
    /// so only unlocalized entries are visible.
    pub fn new(locale: &str) -> Self {
        let base = locale
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        let base = match base {
            "C" | "POSIX" => "en_US",
            other => other,
        };
        let mut tags = Vec::new();
        if base.is_empty() {
            return Self { tags };
        }
        tags.push(base.to_string());
        if let Some((lang, _country)) = base.split_once('_') {
            tags.push(lang.to_string());
        }
        if base == "en_US" {
            tags.push("C".to_string());
        }
        Self { tags }
    }

    /// Chain for the process locale from `LC_ALL`, `LC_MESSAGES` or `LANG`.
    pub fn from_env() -> Self {
        let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|v| env::var(v).ok())
            .find(|v| !v.is_empty())
            .unwrap_or_default();
        Self::new(&locale)
    }

    /// Tags in lookup order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The most specific tag, or `""` for an empty chain.
    pub fn primary(&self) -> &str {
        self.tags.first().map_or("", String::as_str)
    }

    /// True when a line tagged `tag` is visible under this chain.
    pub fn accepts(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_then_language() {
        let chain = LocaleChain::new("de_DE.UTF-8");
        assert_eq!(chain.tags(), ["de_DE", "de"]);
        assert!(chain.accepts("de"));
        assert!(!chain.accepts("fr"));
    }

    #[test]
    fn c_locale_is_english() {
        let chain = LocaleChain::new("C");
        assert_eq!(chain.primary(), "en_US");
        assert!(chain.accepts("C"));
        assert!(chain.accepts("en"));
    }

    #[test]
    fn empty_locale() {
        assert!(LocaleChain::new("").tags().is_empty());
    }
}
