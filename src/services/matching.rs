use crate::models::MatchTerms;
use regex::{Regex, RegexBuilder};

/// One vendor identification term.
#[derive(Debug, Clone)]
enum Term {
    /// Lowercased substring.
    Substring(String),
    Pattern(Regex),
}

/// Decides whether a candidate name, path or value belongs to the vendor.
///
/// Matching is case-insensitive and stops at the first matching term.
#[derive(Debug, Clone)]
pub struct MatchRule {
    terms: Vec<Term>,
}

impl MatchRule {
    /// Build a rule from substrings and regular expressions.
    ///
    /// Empty substrings are ignored; they would match everything.
    pub fn new<S, P>(substrings: S, patterns: P) -> Result<Self, regex::Error>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut terms: Vec<Term> = substrings
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(Term::Substring)
            .collect();

        for pattern in patterns {
            let regex = RegexBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .build()?;
            terms.push(Term::Pattern(regex));
        }

        Ok(Self { terms })
    }

    /// Rule matching any of the given substrings.
    pub fn substrings<S>(substrings: S) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let terms = substrings
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(Term::Substring)
            .collect();
        Self { terms }
    }

    pub fn from_terms(terms: &MatchTerms) -> Result<Self, regex::Error> {
        Self::new(&terms.substrings, &terms.patterns)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.terms.iter().any(|term| match term {
            Term::Substring(needle) => lowered.contains(needle.as_str()),
            Term::Pattern(regex) => regex.is_match(candidate),
        })
    }

    /// True when any of the candidates matches.
    ///
    /// Used where one artifact carries several texts, e.g. a service name
    /// and its display name, or a startup value's name and its data.
    pub fn matches_any<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates.into_iter().any(|c| self.matches(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let rule = MatchRule::substrings(["Adobe", "Creative Cloud"]);
        assert!(rule.matches(r"C:\Program Files\ADOBE\Acrobat"));
        assert!(rule.matches("creative cloud helper"));
        assert!(!rule.matches("Autodesk"));
    }

    #[test]
    fn test_pattern_terms() {
        let rule = MatchRule::new(["Autodesk"], [r"^Adsk\w+", r"AdSSO$"]).unwrap();
        assert!(rule.matches("AdskLicensingService"));
        assert!(rule.matches("adsklicensingagent"));
        assert!(rule.matches("Autodesk AdSSO"));
        assert!(!rule.matches("MyAdskTool"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(MatchRule::new(Vec::<&str>::new(), ["(unclosed"]).is_err());
    }

    #[test]
    fn test_empty_terms_match_nothing() {
        let rule = MatchRule::substrings(["", "   "]);
        assert!(rule.is_empty());
        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_matches_any_name_or_data() {
        let rule = MatchRule::substrings(["VendorX"]);
        assert!(rule.matches_any(["Updater1", r"C:\Program Files\VendorX\updater.exe"]));
        assert!(!rule.matches_any(["Updater1", r"C:\Program Files\Other\updater.exe"]));
    }
}
