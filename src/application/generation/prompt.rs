use std::fmt::Write as _;

use crate::domain::categories::Category;

pub const SYSTEM_PROMPT: &str = "You are a staff writer for Peoples Thread, an independent \
news outlet covering working people, democracy and the economy. Write clear, factual, \
well-sourced journalism in plain language. Never invent quotes or statistics. Reply with a \
single JSON object and nothing else.";

const RESPONSE_SHAPE: &str = r#"{"title": "...", "excerpt": "one or two sentences", "body": "paragraphs separated by blank lines", "tags": ["..."], "category": "<one of the categories>"}"#;

/// Prompt for an article written from a topic (scheduled posts and on-demand drafts).
#[derive(Debug, Clone)]
pub struct TopicPrompt<'a> {
    pub topic: &'a str,
    pub category: Category,
    pub instructions: Option<&'a str>,
}

impl TopicPrompt<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Write a news article about the following topic.");
        let _ = writeln!(out);
        let _ = writeln!(out, "Topic: {}", self.topic.trim());
        let _ = writeln!(
            out,
            "Category: {} ({})",
            self.category.display_name(),
            self.category.slug()
        );
        if let Some(instructions) = self.instructions.map(str::trim).filter(|i| !i.is_empty()) {
            let _ = writeln!(out, "Editor instructions: {instructions}");
        }
        push_requirements(&mut out);
        out
    }
}

/// Prompt for a response piece to a PBS NewsHour story.
#[derive(Debug, Clone)]
pub struct ResponsePrompt<'a> {
    pub source_title: &'a str,
    pub source_url: &'a str,
    pub summary: &'a str,
    pub source_body: Option<&'a str>,
    pub keywords: &'a [String],
    pub category: Category,
}

impl ResponsePrompt<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Write an original response article to the PBS NewsHour story below. Add context \
             about how the story affects working people; do not copy sentences from the source."
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Source title: {}", self.source_title.trim());
        let _ = writeln!(out, "Source link: {}", self.source_url.trim());
        if !self.summary.trim().is_empty() {
            let _ = writeln!(out, "Source summary: {}", self.summary.trim());
        }
        if let Some(body) = self.source_body.map(str::trim).filter(|b| !b.is_empty()) {
            let _ = writeln!(out, "Source text:");
            let _ = writeln!(out, "{body}");
        }
        if !self.keywords.is_empty() {
            let _ = writeln!(out, "Matched keywords: {}", self.keywords.join(", "));
        }
        let _ = writeln!(
            out,
            "Suggested category: {} ({})",
            self.category.display_name(),
            self.category.slug()
        );
        let _ = writeln!(
            out,
            "Cite the source as PBS NewsHour and link to it in the final paragraph."
        );
        push_requirements(&mut out);
        out
    }
}

fn push_requirements(out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, "Allowed categories: {}", Category::slug_list());
    let _ = writeln!(out, "Length: 400 to 800 words.");
    let _ = writeln!(out, "Respond with JSON in exactly this shape:");
    let _ = write!(out, "{RESPONSE_SHAPE}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_prompt_includes_topic_and_instructions() {
        let prompt = TopicPrompt {
            topic: "Teachers strike in Chicago",
            category: Category::Labor,
            instructions: Some("Focus on pay."),
        }
        .render();

        assert!(prompt.contains("Topic: Teachers strike in Chicago"));
        assert!(prompt.contains("Category: Labor (labor)"));
        assert!(prompt.contains("Editor instructions: Focus on pay."));
        assert!(prompt.contains(&Category::slug_list()));
        assert!(prompt.ends_with(RESPONSE_SHAPE));
    }

    #[test]
    fn topic_prompt_skips_blank_instructions() {
        let prompt = TopicPrompt {
            topic: "Rent",
            category: Category::Economy,
            instructions: Some("   "),
        }
        .render();
        assert!(!prompt.contains("Editor instructions"));
    }

    #[test]
    fn response_prompt_is_deterministic() {
        let keywords = vec!["strike".to_string(), "union".to_string()];
        let prompt = ResponsePrompt {
            source_title: "Union vote at plant",
            source_url: "https://www.pbs.org/newshour/union-vote",
            summary: "Workers voted.",
            source_body: Some("Full text."),
            keywords: &keywords,
            category: Category::Labor,
        };

        let rendered = prompt.render();
        assert_eq!(rendered, prompt.render());
        assert!(rendered.contains("Source link: https://www.pbs.org/newshour/union-vote"));
        assert!(rendered.contains("Source text:\nFull text."));
        assert!(rendered.contains("Matched keywords: strike, union"));
    }
}
