//! State to markup.
//!
//! Every externally sourced string goes through [`escape_html`] before it
//! is placed in markup. The only exception is assistant message content,
//! which is handed to a [`MarkdownFormatter`] whose output is trusted.

use chrono::{DateTime, Local, Utc};
use pulldown_cmark::{html, Event, Options, Parser};
use tracing::debug;

use crate::error::FormatError;
use crate::models::{Bookmark, ChatMessage, HistoryEntry, Paper, Role};
use crate::ui::Toast;

pub const ABSTRACT_PREVIEW_CHARS: usize = 300;
pub const CARD_CATEGORY_COUNT: usize = 3;
pub const BOOKMARK_TITLE_CHARS: usize = 80;

pub const LOADING_TEXT: &str = "🤔 AI is analyzing the paper and formulating a comprehensive response...";

pub trait MarkdownFormatter {
    fn render(&self, markdown: &str) -> Result<String, FormatError>;
}

/// CommonMark with the GitHub extensions, hard line breaks, raw HTML
/// passthrough and smart punctuation.
#[derive(Debug, Clone, Copy)]
pub struct CommonMarkFormatter {
    options: Options,
}

impl Default for CommonMarkFormatter {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        CommonMarkFormatter { options }
    }
}

impl MarkdownFormatter for CommonMarkFormatter {
    fn render(&self, markdown: &str) -> Result<String, FormatError> {
        let options = self.options;
        std::panic::catch_unwind(|| {
            let parser = Parser::new_ext(markdown, options).map(|event| match event {
                Event::SoftBreak => Event::HardBreak,
                other => other,
            });
            let mut out = String::with_capacity(markdown.len() * 3 / 2);
            html::push_html(&mut out, parser);
            out
        })
        .map_err(|_| FormatError("markdown parser panicked".to_string()))
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cuts `text` to at most `max` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%b %-d, %Y").to_string()
}

pub fn format_datetime(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%b %-d, %Y %H:%M").to_string()
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn escape_list(items: &[String]) -> String {
    escape_html(&items.join(", "))
}

pub fn card_body(paper: &Paper) -> String {
    let categories: Vec<String> = paper
        .categories
        .iter()
        .take(CARD_CATEGORY_COUNT)
        .cloned()
        .collect();

    format!(
        r#"<div class="paper-title">{title}</div>
<div class="paper-authors">Authors: {authors}</div>
<div class="paper-abstract">{abstract_text}</div>
<div class="paper-meta"><span class="date">{date}</span> <span class="tags">{categories}</span></div>"#,
        title = escape_html(&paper.title),
        authors = escape_list(&paper.authors),
        abstract_text = escape_html(&truncate_chars(&paper.abstract_text, ABSTRACT_PREVIEW_CHARS)),
        date = format_date(&paper.published),
        categories = escape_list(&categories),
    )
}

pub fn bookmark_button(index: usize, bookmarked: bool) -> String {
    let (class, title) = if bookmarked {
        ("paper-bookmark bookmarked", "Remove bookmark")
    } else {
        ("paper-bookmark", "Bookmark paper")
    };
    format!(
        r#"<button class="{}" data-action="bookmark" data-index="{}" title="{}">&#9733;</button>"#,
        class,
        index + 1,
        title
    )
}

pub fn card(index: usize, body: &str, bookmarked: bool) -> String {
    format!(
        r#"<div class="paper-card" data-action="select" data-index="{}">
<div class="paper-card-header">{}</div>
{}
</div>"#,
        index + 1,
        bookmark_button(index, bookmarked),
        body
    )
}

pub fn loading_notice() -> String {
    r#"<div class="loading">Searching papers...</div>"#.to_string()
}

pub fn empty_notice() -> String {
    r#"<div class="error">No papers found. Try a different search term.</div>"#.to_string()
}

pub fn error_notice() -> String {
    r#"<div class="error">Error searching papers. Please try again.</div>"#.to_string()
}

pub fn selected_paper(paper: &Paper) -> String {
    format!(
        r#"<h3>{title}</h3>
<p><strong>Authors:</strong> {authors}</p>
<p><strong>Published:</strong> {date}</p>
<p><strong>Abstract:</strong> {abstract_text}</p>
<p><strong>Categories:</strong> {categories}</p>"#,
        title = escape_html(&paper.title),
        authors = escape_list(&paper.authors),
        date = format_date(&paper.published),
        abstract_text = escape_html(&truncate_chars(&paper.abstract_text, ABSTRACT_PREVIEW_CHARS)),
        categories = escape_list(&paper.categories),
    )
}

fn message_body(message: &ChatMessage, formatter: Option<&dyn MarkdownFormatter>) -> String {
    let plain = || format!("<p>{}</p>", escape_html(&message.content));

    match (message.role, formatter) {
        (Role::Assistant, Some(formatter)) => match formatter.render(&message.content) {
            Ok(html) => html,
            Err(e) => {
                debug!("{}; rendering as plain text", e);
                plain()
            }
        },
        _ => plain(),
    }
}

pub fn message(message: &ChatMessage, formatter: Option<&dyn MarkdownFormatter>) -> String {
    format!(
        r#"<div class="message {role}">{body}<div class="message-timestamp">{time}</div></div>"#,
        role = message.role.as_str(),
        body = message_body(message, formatter),
        time = format_time(&message.timestamp),
    )
}

pub fn loading_message() -> String {
    format!(r#"<div class="message loading">{}</div>"#, LOADING_TEXT)
}

pub fn history_list(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "<p>No search history yet</p>".to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                r#"<div class="history-item" data-action="repeat" data-index="{}">
<div><strong>{}</strong></div>
<div>{} results</div>
<time>{}</time>
</div>"#,
                i + 1,
                escape_html(&entry.query),
                entry.result_count,
                format_datetime(&entry.timestamp),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn bookmarks_list(bookmarks: &[Bookmark]) -> String {
    if bookmarks.is_empty() {
        return "<p>No bookmarked papers yet</p>".to_string();
    }

    bookmarks
        .iter()
        .enumerate()
        .map(|(i, bookmark)| {
            format!(
                r#"<div class="bookmark-item" data-action="open" data-index="{}">
<div><strong>{}</strong></div>
<div class="date">Bookmarked: {}</div>
</div>"#,
                i + 1,
                escape_html(&truncate_chars(&bookmark.paper.title, BOOKMARK_TITLE_CHARS)),
                format_date(&bookmark.bookmarked_at),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn toast(toast: Option<&Toast>) -> String {
    match toast {
        Some(toast) => format!(
            r#"<div id="toast" class="toast {} show">{}</div>"#,
            toast.severity.as_str(),
            escape_html(&toast.message)
        ),
        None => r#"<div id="toast" class="toast"></div>"#.to_string(),
    }
}
