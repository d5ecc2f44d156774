//! Markdown to plain text for previews and embeddings

use regex::Regex;

/// Ordered regex rewrites that strip Markdown syntax
pub struct MarkdownStripper {
    rules: Vec<(Regex, &'static str)>,
    newlines: Regex,
}

impl MarkdownStripper {
    pub fn new() -> Result<Self, regex::Error> {
        // Images before links, otherwise `![alt](src)` leaves a stray `!`
        let rules = vec![
            (Regex::new(r"(?s)\A---.*?---\n?")?, ""),
            (Regex::new(r"(?s)```.*?```")?, ""),
            (Regex::new(r"!\[([^\]]*)\]\([^)]*\)")?, "$1"),
            (Regex::new(r"\[([^\]]*)\]\([^)]*\)")?, "$1"),
            (Regex::new(r"#+\s")?, ""),
            (Regex::new(r"\*\*(.*?)\*\*")?, "$1"),
            (Regex::new(r"\*(.*?)\*")?, "$1"),
            (Regex::new(r"`(.*?)`")?, "$1"),
            (Regex::new(r">\s")?, ""),
        ];

        Ok(Self {
            rules,
            newlines: Regex::new(r"\n+")?,
        })
    }

    pub fn strip(&self, markdown: &str) -> String {
        let mut text = markdown.replace("\r\n", "\n");

        for (pattern, replacement) in &self.rules {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }

        self.newlines.replace_all(&text, " ").trim().to_string()
    }
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
