//! The page document: every region the app renders into.
//!
//! Regions hold finished markup produced by [`crate::render`]. The document
//! is serialized as a whole with [`Page::to_html`].

use crate::render;

pub const SEARCH_LABEL: &str = "Search";
pub const SEARCHING_LABEL: &str = "Searching...";
pub const SEND_LABEL: &str = "Send";
pub const SENDING_LABEL: &str = "Sending...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub disabled: bool,
}

impl Button {
    fn new(label: &str) -> Self {
        Button {
            label: label.to_string(),
            disabled: false,
        }
    }

    pub fn set_busy(&mut self, label: &str) {
        self.label = label.to_string();
        self.disabled = true;
    }

    pub fn set_ready(&mut self, label: &str) {
        self.label = label.to_string();
        self.disabled = false;
    }

    fn to_html(&self, id: &str) -> String {
        format!(
            r#"<button id="{}"{}>{}</button>"#,
            id,
            if self.disabled { " disabled" } else { "" },
            render::escape_html(&self.label)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardNode {
    pub paper_id: String,
    pub body: String,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Results {
    Notice(String),
    Cards(Vec<CardNode>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSection {
    pub visible: bool,
    pub paper: String,
    pub messages: Vec<String>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub search_input: String,
    pub limit: u32,
    pub search_button: Button,
    pub results: Results,
    pub chat: ChatSection,
    pub send_button: Button,
    pub history_open: bool,
    pub history_list: String,
    pub bookmarks_open: bool,
    pub bookmarks_list: String,
    pub toast: String,
    pub refresh_secs: u32,
}

impl Page {
    pub fn new(limit: u32, refresh_secs: u32) -> Self {
        Page {
            search_input: String::new(),
            limit,
            search_button: Button::new(SEARCH_LABEL),
            results: Results::Cards(Vec::new()),
            chat: ChatSection::default(),
            send_button: Button::new(SEND_LABEL),
            history_open: false,
            history_list: render::history_list(&[]),
            bookmarks_open: false,
            bookmarks_list: render::bookmarks_list(&[]),
            toast: render::toast(None),
            refresh_secs,
        }
    }

    /// Flips the bookmark button of every card showing `paper_id`, leaving
    /// the rest of the result list untouched. Returns false when no card
    /// shows that paper.
    pub fn set_card_bookmarked(&mut self, paper_id: &str, bookmarked: bool) -> bool {
        let Results::Cards(cards) = &mut self.results else {
            return false;
        };
        let mut found = false;
        for card in cards.iter_mut().filter(|c| c.paper_id == paper_id) {
            card.bookmarked = bookmarked;
            found = true;
        }
        found
    }

    pub fn card_count(&self) -> usize {
        match &self.results {
            Results::Cards(cards) => cards.len(),
            Results::Notice(_) => 0,
        }
    }

    fn results_html(&self) -> String {
        match &self.results {
            Results::Notice(notice) => notice.clone(),
            Results::Cards(cards) => cards
                .iter()
                .enumerate()
                .map(|(i, card)| render::card(i, &card.body, card.bookmarked))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn chat_html(&self) -> String {
        let mut messages = self.chat.messages.join("\n");
        if self.chat.loading {
            messages.push('\n');
            messages.push_str(&render::loading_message());
        }
        format!(
            r#"<section class="chat-section" style="display: {}">
<div id="selectedPaper" class="selected-paper">{}</div>
<div id="chatMessages" class="chat-messages">{}</div>
<div class="chat-input">{}</div>
</section>"#,
            if self.chat.visible { "block" } else { "none" },
            self.chat.paper,
            messages,
            self.send_button.to_html("sendBtn"),
        )
    }

    fn panel_html(id: &str, list_id: &str, title: &str, open: bool, list: &str) -> String {
        format!(
            r#"<aside id="{}" class="side-panel{}">
<h2>{}</h2>
<div id="{}">{}</div>
</aside>"#,
            id,
            if open { " active" } else { "" },
            title,
            list_id,
            list
        )
    }

    pub fn to_html(&self) -> String {
        let refresh = if self.refresh_secs > 0 {
            format!(r#"<meta http-equiv="refresh" content="{}">"#, self.refresh_secs)
        } else {
            String::new()
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
{refresh}
<title>ArxivChat</title>
<style>{css}</style>
</head>
<body>
<header class="header-actions"><h1>ArxivChat</h1></header>
<main>
<div class="search-bar">
<input id="searchQuery" type="text" value="{query}">
<span id="limitSelect">{limit}</span>
{search_button}
</div>
<div id="searchResults">{results}</div>
{chat}
</main>
{history}
{bookmarks}
{toast}
</body>
</html>
"#,
            refresh = refresh,
            css = CSS,
            query = render::escape_html(&self.search_input),
            limit = self.limit,
            search_button = self.search_button.to_html("searchBtn"),
            results = self.results_html(),
            chat = self.chat_html(),
            history = Self::panel_html(
                "historyPanel",
                "historyList",
                "Search History",
                self.history_open,
                &self.history_list
            ),
            bookmarks = Self::panel_html(
                "bookmarksPanel",
                "bookmarksList",
                "Bookmarks",
                self.bookmarks_open,
                &self.bookmarks_list
            ),
            toast = self.toast,
        )
    }
}

const CSS: &str = r#"
body { font-family: sans-serif; margin: 0; color: #222; }
main { max-width: 960px; margin: 0 auto; padding: 1rem; }
.paper-card { border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem; margin-bottom: 0.75rem; }
.paper-card-header { float: right; }
.paper-title { font-weight: bold; }
.paper-bookmark.bookmarked { color: #e0a800; }
.loading { color: #666; font-style: italic; }
.error { color: #b00020; }
.message { padding: 0.5rem; margin: 0.5rem 0; border-radius: 6px; }
.message.user { background: #e8f0fe; }
.message.assistant { background: #f4f4f4; }
.message-timestamp { font-size: 0.75rem; color: #888; }
.side-panel { display: none; position: fixed; top: 0; right: 0; width: 320px; height: 100%; overflow-y: auto; background: #fff; border-left: 1px solid #ddd; padding: 1rem; }
.side-panel.active { display: block; }
.toast { display: none; position: fixed; bottom: 1rem; right: 1rem; padding: 0.75rem 1rem; border-radius: 6px; color: #fff; }
.toast.show { display: block; }
.toast.info { background: #1a73e8; }
.toast.success { background: #188038; }
.toast.warning { background: #e37400; }
.toast.error { background: #b00020; }
"#;
