//! Portable Text (Sanity's rich-text block format) helpers.
//!
//! Answers and author bios arrive as arrays of blocks. Schema generation needs
//! them flattened to plain text; page rendering converts them to Markdown and
//! lets the Markdown renderer produce HTML.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "_type", default)]
    pub kind: String,
    pub style: Option<String>,
    pub list_item: Option<String>,
    pub level: Option<u32>,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(default)]
    pub mark_defs: Vec<MarkDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key", default)]
    pub key: String,
    #[serde(rename = "_type", default)]
    pub kind: String,
    pub href: Option<String>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "block".to_string(),
            style: Some("normal".to_string()),
            children: vec![Span {
                kind: "span".to_string(),
                text: text.into(),
                marks: Vec::new(),
            }],
            ..Self::default()
        }
    }

    fn is_text(&self) -> bool {
        self.kind == "block"
    }

    fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }

    fn link_for(&self, mark: &str) -> Option<&str> {
        self.mark_defs
            .iter()
            .find(|def| def.key == mark && def.kind == "link")
            .and_then(|def| def.href.as_deref())
    }

    fn markdown_inline(&self) -> String {
        let mut out = String::new();
        for span in &self.children {
            if span.text.is_empty() {
                continue;
            }
            let mut text = escape_markdown(&span.text);
            for mark in &span.marks {
                text = match mark.as_str() {
                    "strong" => format!("**{text}**"),
                    "em" => format!("*{text}*"),
                    "code" => format!("`{}`", span.text.replace('`', "")),
                    "strike-through" => format!("~~{text}~~"),
                    other => match self.link_for(other) {
                        Some(href) => format!("[{text}](<{href}>)"),
                        None => text,
                    },
                };
            }
            out.push_str(&text);
        }
        out
    }
}

/// Joins the text of every `block`-typed entry with single spaces, ignoring
/// embedded images and other custom block types.
pub fn to_plain_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| {
            if block.is_text() {
                block.plain_text()
            } else {
                String::new()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Renders text blocks as CommonMark. Headings map from `h1`–`h6` styles,
/// `blockquote` to quotes, and list items keep their nesting level.
pub fn to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut previous_was_list = false;
    for block in blocks.iter().filter(|block| block.is_text()) {
        let inline = block.markdown_inline();
        if inline.trim().is_empty() {
            continue;
        }
        let is_list = block.list_item.is_some();
        if !out.is_empty() {
            out.push_str(if is_list && previous_was_list {
                "\n"
            } else {
                "\n\n"
            });
        }
        if let Some(kind) = block.list_item.as_deref() {
            let depth = block.level.unwrap_or(1).saturating_sub(1) as usize;
            let bullet = if kind == "number" { "1." } else { "-" };
            out.push_str(&"   ".repeat(depth));
            out.push_str(bullet);
            out.push(' ');
            out.push_str(&inline);
        } else {
            match block.style.as_deref() {
                Some(style @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6")) => {
                    let level = style[1..].parse::<usize>().unwrap_or(2);
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    out.push_str(&inline);
                }
                Some("blockquote") => {
                    out.push_str("> ");
                    out.push_str(&inline);
                }
                _ => out.push_str(&inline),
            }
        }
        previous_was_list = is_list;
    }
    out
}

/// Shortens `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>' | '#' | '~' | '|'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
