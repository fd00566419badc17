use regex::Regex;

use super::feed::FeedItem;

/// Case-insensitive keyword matcher over feed titles and descriptions.
///
/// Purely alphanumeric keywords (spaces allowed) match on word boundaries so
/// `war` does not hit `software`; anything with punctuation is a substring match.
pub struct KeywordMatcher {
    rules: Vec<(String, Rule)>,
}

enum Rule {
    Word(Regex),
    Substring(String),
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = keywords
            .into_iter()
            .filter_map(|keyword| {
                let keyword = keyword.as_ref().trim().to_lowercase();
                if keyword.is_empty() {
                    return None;
                }
                let rule = if keyword.chars().all(|c| c.is_alphanumeric() || c == ' ') {
                    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&keyword)))
                        .map(Rule::Word)
                        .unwrap_or_else(|_| Rule::Substring(keyword.clone()))
                } else {
                    Rule::Substring(keyword.clone())
                };
                Some((keyword, rule))
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Keywords found in the text, in configured order.
    pub fn matches(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|(_, rule)| match rule {
                Rule::Word(re) => re.is_match(text),
                Rule::Substring(needle) => lowered.contains(needle.as_str()),
            })
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }

    pub fn match_item(&self, item: &FeedItem) -> Vec<String> {
        self.matches(&format!("{}\n{}", item.title, item.description))
    }
}
