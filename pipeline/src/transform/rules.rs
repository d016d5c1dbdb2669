//! Ordered keyword rules for free-text categorization.
//!
//! A [`RuleSet`] is evaluated top to bottom against the uppercased input and
//! the first rule with a keyword contained in the text decides the label.
//! Keywords are substrings, not tokens: `"OIL"` matches `"HEATING OIL"` and
//! also `"BOILER LEAK"`.

use serde::{Deserialize, Serialize};

/// One `(keywords, label)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Label assigned when this rule matches
    pub label: String,
    /// Substrings searched for in the uppercased input
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(label: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// First keyword contained in `upper`, if any.
    pub fn matching_keyword(&self, upper: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| upper.contains(&k.to_uppercase()))
            .map(String::as_str)
    }

    pub fn matches(&self, upper: &str) -> bool {
        self.matching_keyword(upper).is_some()
    }
}

pub const DEFAULT_FALLBACK: &str = "Other";
pub const DEFAULT_MISSING: &str = "Unknown";

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

fn default_missing() -> String {
    DEFAULT_MISSING.to_string()
}

/// Priority-ordered rules plus the labels for unmatched and missing input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
    /// Label for text no rule matches
    #[serde(default = "default_fallback")]
    pub fallback: String,
    /// Label for a null cell
    #[serde(default = "default_missing")]
    pub missing: String,
}

/// A partial [`RuleSet`] read from a config file. Fields left out keep the
/// value of the set it is applied to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleSetPatch {
    pub rules: Option<Vec<KeywordRule>>,
    pub fallback: Option<String>,
    pub missing: Option<String>,
}

impl RuleSetPatch {
    pub fn apply(self, mut base: RuleSet) -> RuleSet {
        if let Some(rules) = self.rules {
            base.rules = rules;
        }
        if let Some(fallback) = self.fallback {
            base.fallback = fallback;
        }
        if let Some(missing) = self.missing {
            base.missing = missing;
        }
        base
    }
}

/// Outcome of [`RuleSet::explain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    /// Index of the rule that matched
    pub rule: Option<usize>,
    pub keyword: Option<String>,
}

impl RuleSet {
    pub fn new(rules: Vec<KeywordRule>, fallback: impl Into<String>, missing: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
            missing: missing.into(),
        }
    }

    /// Label for `text`; `None` is a missing value.
    pub fn classify(&self, text: Option<&str>) -> &str {
        let Some(text) = text else {
            return &self.missing;
        };
        let upper = text.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&upper))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    /// Like [`classify`](Self::classify) but reports which rule and keyword decided.
    pub fn explain(&self, text: Option<&str>) -> Classification {
        let Some(text) = text else {
            return Classification { label: self.missing.clone(), rule: None, keyword: None };
        };
        let upper = text.to_uppercase();
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(keyword) = rule.matching_keyword(&upper) {
                return Classification {
                    label: rule.label.clone(),
                    rule: Some(index),
                    keyword: Some(keyword.to_string()),
                };
            }
        }
        Classification { label: self.fallback.clone(), rule: None, keyword: None }
    }

    /// Problems that would make the set unusable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.label.trim().is_empty() {
                problems.push(format!("rule {} has an empty label", i));
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                problems.push(format!("rule '{}' has an empty keyword", rule.label));
            }
        }
        problems
    }

    /// Human-readable table of the rules.
    pub fn describe(&self, title: &str) -> String {
        let mut out = format!("{}\n", title);
        for (i, rule) in self.rules.iter().enumerate() {
            out.push_str(&format!("  {}. {:<24} {}\n", i + 1, rule.label, rule.keywords.join(", ")));
        }
        out.push_str(&format!("  -  {:<24} (no keyword matched)\n", self.fallback));
        out.push_str(&format!("  -  {:<24} (missing value)\n", self.missing));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> RuleSet {
        RuleSet::new(
            vec![
                KeywordRule::new("Warm", &["RED", "ORANGE"]),
                KeywordRule::new("Cool", &["BLUE", "RED WINE"]),
            ],
            "Other",
            "Unknown",
        )
    }

    #[test]
    fn test_first_match_wins() {
        let rules = colors();
        // "RED WINE" is listed under Cool but Warm is checked first
        assert_eq!(rules.classify(Some("red wine stain")), "Warm");
        assert_eq!(rules.classify(Some("Blue")), "Cool");
    }

    #[test]
    fn test_fallback_and_missing() {
        let rules = colors();
        assert_eq!(rules.classify(Some("green")), "Other");
        assert_eq!(rules.classify(Some("")), "Other");
        assert_eq!(rules.classify(None), "Unknown");
    }

    #[test]
    fn test_lowercase_keywords_still_match() {
        let rules = RuleSet::new(vec![KeywordRule::new("Acidic", &["acid"])], "Other", "Unknown");
        assert_eq!(rules.classify(Some("Sulfuric ACID")), "Acidic");
    }

    #[test]
    fn test_explain_reports_rule_and_keyword() {
        let rules = colors();
        let c = rules.explain(Some("deep orange"));
        assert_eq!(c.label, "Warm");
        assert_eq!(c.rule, Some(0));
        assert_eq!(c.keyword.as_deref(), Some("ORANGE"));

        let c = rules.explain(Some("grey"));
        assert_eq!(c.label, "Other");
        assert_eq!(c.rule, None);
    }

    #[test]
    fn test_deserialize_fills_missing_labels() {
        let rules: RuleSet =
            serde_json::from_str(r#"{"rules": [{"label": "Warm", "keywords": ["RED"]}]}"#).unwrap();
        assert_eq!(rules.fallback, "Other");
        assert_eq!(rules.missing, "Unknown");
        assert_eq!(rules.classify(Some("red")), "Warm");
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let patch: RuleSetPatch = serde_json::from_str(r#"{"fallback": "Elsewhere"}"#).unwrap();
        let patched = patch.apply(colors());
        assert_eq!(patched.rules, colors().rules);
        assert_eq!(patched.fallback, "Elsewhere");
        assert_eq!(patched.missing, "Unknown");
    }

    #[test]
    fn test_problems_flags_empty_keyword() {
        let rules = RuleSet::new(vec![KeywordRule::new("X", &[" "])], "Other", "Unknown");
        assert_eq!(rules.problems().len(), 1);
        assert!(colors().problems().is_empty());
    }
}
