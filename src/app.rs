//! Application state and the update step.
//!
//! `App` is the single owner of everything the page shows. User actions and
//! request completions arrive as [`Message`]s; `update` mutates state,
//! re-renders the affected page regions and returns the [`Effect`]s the
//! runtime has to carry out. Nothing here blocks or performs I/O beyond the
//! synchronous key-value store.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::HealthStatus;
use crate::bookmarks::{Bookmarks, Toggled};
use crate::config::Config;
use crate::conversation::{ChatTicket, Conversation, Reply, SendRejected, MAX_MESSAGE_CHARS};
use crate::error::ApiError;
use crate::export::{self, Artifact};
use crate::history::SearchHistory;
use crate::models::Paper;
use crate::page::{CardNode, Page, Results, SEARCHING_LABEL, SEARCH_LABEL, SENDING_LABEL, SEND_LABEL};
use crate::render::{self, CommonMarkFormatter, MarkdownFormatter};
use crate::search::{self, SearchController, SearchOutcome, SearchRejected, SearchTicket, MAX_QUERY_CHARS};
use crate::store::KeyValueStore;
use crate::ui::{Panel, Panels, Severity, Toast, ToastId, Notifier, TOAST_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Chat,
    History,
    Bookmarks,
}

#[derive(Debug)]
pub enum Message {
    Search { query: String, limit: Option<u32> },
    SearchFinished { ticket: SearchTicket, result: Result<Vec<Paper>, ApiError> },
    SelectPaper(usize),
    SelectBookmark(usize),
    SendChat(String),
    ChatFinished { ticket: ChatTicket, result: Result<Option<String>, ApiError> },
    ToggleBookmark(usize),
    ToggleHistory,
    ToggleBookmarks,
    ClosePanels,
    RepeatSearch(usize),
    ExportConversation,
    DownloadFailed { filename: String, reason: String },
    Clear(ClearTarget),
    ClearConfirmed(ClearTarget),
    DismissToast(ToastId),
    CheckHealth,
    HealthChecked(Result<HealthStatus, ApiError>),
}

#[derive(Debug)]
pub enum Effect {
    Search(SearchTicket),
    Chat(ChatTicket),
    CheckHealth,
    Download(Artifact),
    Confirm { prompt: String, then: Message },
    DismissToast { id: ToastId, after: Duration },
}

pub struct App {
    store: Box<dyn KeyValueStore>,
    history: SearchHistory,
    bookmarks: Bookmarks,
    search: SearchController,
    conversation: Conversation,
    papers: Vec<Paper>,
    panels: Panels,
    notifier: Notifier,
    formatter: Option<Box<dyn MarkdownFormatter>>,
    page: Page,
}

impl App {
    pub fn new(store: Box<dyn KeyValueStore>, config: &Config) -> Self {
        Self::with_formatter(store, config, Some(Box::new(CommonMarkFormatter::default())))
    }

    pub fn with_formatter(
        store: Box<dyn KeyValueStore>,
        config: &Config,
        formatter: Option<Box<dyn MarkdownFormatter>>,
    ) -> Self {
        let history = SearchHistory::load(store.as_ref());
        let bookmarks = Bookmarks::load(store.as_ref());
        let mut page = Page::new(
            search::clamp_limit(config.search.default_limit),
            config.page.refresh_secs,
        );
        page.history_list = render::history_list(history.entries());
        page.bookmarks_list = render::bookmarks_list(bookmarks.items());
        debug!(
            "loaded {} history entries and {} bookmarks",
            history.len(),
            bookmarks.len()
        );

        App {
            store,
            history,
            bookmarks,
            search: SearchController::default(),
            conversation: Conversation::default(),
            papers: Vec::new(),
            panels: Panels::default(),
            notifier: Notifier::default(),
            formatter,
            page,
        }
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        let mut effects = Vec::new();

        match message {
            Message::Search { query, limit } => self.start_search(&mut effects, query, limit),
            Message::SearchFinished { ticket, result } => {
                self.finish_search(&mut effects, ticket, result)
            }
            Message::SelectPaper(index) => match self.papers.get(index).cloned() {
                Some(paper) => {
                    self.select_paper(paper);
                    self.notify(&mut effects, "Paper selected for chat", Severity::Success);
                }
                None => self.notify(&mut effects, "Error selecting paper", Severity::Error),
            },
            Message::SelectBookmark(index) => {
                match self.bookmarks.get(index).map(|b| b.paper.clone()) {
                    Some(paper) => {
                        self.select_paper(paper);
                        self.panels.close_all();
                        self.notify(&mut effects, "Bookmarked paper selected", Severity::Success);
                    }
                    None => self.notify(&mut effects, "Error selecting paper", Severity::Error),
                }
            }
            Message::SendChat(text) => self.send_chat(&mut effects, &text),
            Message::ChatFinished { ticket, result } => {
                self.finish_chat(&mut effects, ticket, result)
            }
            Message::ToggleBookmark(index) => self.toggle_bookmark(&mut effects, index),
            Message::ToggleHistory => self.panels.toggle_history(),
            Message::ToggleBookmarks => self.panels.toggle_bookmarks(),
            Message::ClosePanels => self.panels.close_all(),
            Message::RepeatSearch(index) => match self.history.get(index).map(|e| e.query.clone()) {
                Some(query) => {
                    self.panels.close_all();
                    self.start_search(&mut effects, query, None);
                }
                None => self.notify(&mut effects, "No such history entry", Severity::Warning),
            },
            Message::ExportConversation => self.export_conversation(&mut effects),
            Message::DownloadFailed { filename, reason } => {
                warn!("could not save {}: {}", filename, reason);
                self.notify(&mut effects, "Export failed", Severity::Error);
            }
            Message::Clear(target) => self.request_clear(&mut effects, target),
            Message::ClearConfirmed(target) => self.clear(&mut effects, target),
            Message::DismissToast(id) => {
                self.notifier.dismiss(id);
            }
            Message::CheckHealth => effects.push(Effect::CheckHealth),
            Message::HealthChecked(result) => self.report_health(&mut effects, result),
        }

        self.sync_controls();
        effects
    }

    fn notify(&mut self, effects: &mut Vec<Effect>, message: impl Into<String>, severity: Severity) {
        let id = self.notifier.show(message, severity);
        effects.push(Effect::DismissToast {
            id,
            after: TOAST_DURATION,
        });
    }

    /// Re-derives the regions that mirror controller and UI state.
    fn sync_controls(&mut self) {
        if self.search.is_busy() {
            self.page.search_button.set_busy(SEARCHING_LABEL);
        } else {
            self.page.search_button.set_ready(SEARCH_LABEL);
        }

        if self.conversation.is_awaiting() {
            self.page.send_button.set_busy(SENDING_LABEL);
        } else {
            self.page.send_button.set_ready(SEND_LABEL);
            self.page.chat.loading = false;
        }

        self.page.history_open = self.panels.is_open(Panel::History);
        self.page.bookmarks_open = self.panels.is_open(Panel::Bookmarks);
        self.page.toast = render::toast(self.notifier.current());
    }

    fn start_search(&mut self, effects: &mut Vec<Effect>, query: String, limit: Option<u32>) {
        let limit = limit.unwrap_or(self.page.limit);

        match self.search.begin(&query, limit) {
            Ok(ticket) => {
                self.page.limit = ticket.limit;
                self.page.search_input = ticket.query.clone();
                self.page.results = Results::Notice(render::loading_notice());
                effects.push(Effect::Search(ticket));
            }
            Err(SearchRejected::EmptyQuery) => {
                self.notify(effects, "Please enter a search query", Severity::Warning)
            }
            Err(SearchRejected::QueryTooLong) => self.notify(
                effects,
                format!("Query too long (max {} characters)", MAX_QUERY_CHARS),
                Severity::Warning,
            ),
            Err(SearchRejected::Busy) => debug!("search ignored, another one is in flight"),
        }
    }

    fn finish_search(
        &mut self,
        effects: &mut Vec<Effect>,
        ticket: SearchTicket,
        result: Result<Vec<Paper>, ApiError>,
    ) {
        if !self.search.finish(&ticket) {
            debug!("ignoring completion of unknown search #{}", ticket.id);
            return;
        }

        match SearchOutcome::from(result) {
            SearchOutcome::Found(papers) => {
                let count = papers.len();
                self.page.results = Results::Cards(
                    papers
                        .iter()
                        .map(|paper| CardNode {
                            paper_id: paper.id.clone(),
                            body: render::card_body(paper),
                            bookmarked: self.bookmarks.contains(&paper.id),
                        })
                        .collect(),
                );
                self.papers = papers;

                let now = Utc::now();
                self.history
                    .record(self.store.as_mut(), &ticket.query, count as u32, now);
                self.page.history_list = render::history_list(self.history.entries());
                self.notify(effects, format!("Found {} papers", count), Severity::Success);
            }
            SearchOutcome::Empty => {
                self.papers.clear();
                self.page.results = Results::Notice(render::empty_notice());
                self.notify(effects, "No papers found", Severity::Warning);
            }
            SearchOutcome::Failed(e) => {
                warn!("search for {:?} failed: {}", ticket.query, e);
                self.papers.clear();
                self.page.results = Results::Notice(render::error_notice());
                self.notify(effects, "Search failed. Please try again.", Severity::Error);
            }
        }
    }

    fn select_paper(&mut self, paper: Paper) {
        self.page.chat.paper = render::selected_paper(&paper);
        self.conversation.select(paper, Utc::now());
        self.page.chat.visible = true;
        self.page.chat.messages = self
            .conversation
            .messages()
            .iter()
            .map(|m| render::message(m, self.formatter.as_deref()))
            .collect();
    }

    /// Renders the newest conversation message into the chat region.
    fn append_last_message(&mut self) {
        if let Some(last) = self.conversation.messages().last() {
            let markup = render::message(last, self.formatter.as_deref());
            self.page.chat.messages.push(markup);
        }
    }

    fn send_chat(&mut self, effects: &mut Vec<Effect>, text: &str) {
        match self.conversation.send(text, Utc::now()) {
            Ok(ticket) => {
                self.append_last_message();
                self.page.chat.loading = true;
                effects.push(Effect::Chat(ticket));
            }
            Err(SendRejected::NoPaper) | Err(SendRejected::EmptyMessage) => {
                self.notify(effects, "Please enter a message", Severity::Warning)
            }
            Err(SendRejected::MessageTooLong) => self.notify(
                effects,
                format!("Message too long (max {} characters)", MAX_MESSAGE_CHARS),
                Severity::Warning,
            ),
            Err(SendRejected::Busy) => debug!("message ignored, a response is pending"),
        }
    }

    fn finish_chat(
        &mut self,
        effects: &mut Vec<Effect>,
        ticket: ChatTicket,
        result: Result<Option<String>, ApiError>,
    ) {
        if let Err(e) = &result {
            if self.conversation.is_current(&ticket) {
                warn!("chat about {} failed: {}", ticket.paper_id, e);
            }
        }

        let Some(reply) = self.conversation.complete(&ticket, result, Utc::now()) else {
            return;
        };

        self.page.chat.loading = false;
        self.append_last_message();

        match reply {
            Reply::Answered => {
                info!("answer received for {}", ticket.paper_id);
                self.notify(effects, "Response generated successfully", Severity::Success)
            }
            Reply::NoContent => self.notify(effects, "No response generated", Severity::Warning),
            Reply::Failed => self.notify(effects, "Chat failed. Please try again.", Severity::Error),
        }
    }

    fn toggle_bookmark(&mut self, effects: &mut Vec<Effect>, index: usize) {
        let Some(paper) = self.papers.get(index).cloned() else {
            self.notify(effects, "Error bookmarking paper", Severity::Error);
            return;
        };

        let toggled = self.bookmarks.toggle(self.store.as_mut(), &paper, Utc::now());
        self.page
            .set_card_bookmarked(&paper.id, toggled == Toggled::Added);
        self.page.bookmarks_list = render::bookmarks_list(self.bookmarks.items());

        match toggled {
            Toggled::Added => self.notify(effects, "Paper bookmarked", Severity::Success),
            Toggled::Removed => self.notify(effects, "Bookmark removed", Severity::Success),
        }
    }

    fn export_conversation(&mut self, effects: &mut Vec<Effect>) {
        if !self.conversation.has_exchange() {
            self.notify(effects, "No conversation to export", Severity::Warning);
            return;
        }
        let Some(paper) = self.conversation.paper() else {
            return;
        };

        match export::conversation(paper, self.conversation.messages(), Utc::now()) {
            Ok(artifact) => {
                effects.push(Effect::Download(artifact));
                self.notify(effects, "Conversation exported", Severity::Success);
            }
            Err(e) => {
                warn!("could not serialize conversation: {}", e);
                self.notify(effects, "Export failed", Severity::Error);
            }
        }
    }

    fn request_clear(&mut self, effects: &mut Vec<Effect>, target: ClearTarget) {
        let (nothing_to_clear, empty_message, prompt) = match target {
            ClearTarget::Chat => (
                !self.conversation.has_exchange(),
                "No conversation to clear",
                "Clear current conversation?",
            ),
            ClearTarget::History => (
                self.history.is_empty(),
                "No history to clear",
                "Clear all search history?",
            ),
            ClearTarget::Bookmarks => (
                self.bookmarks.is_empty(),
                "No bookmarks to clear",
                "Clear all bookmarks?",
            ),
        };

        if nothing_to_clear {
            self.notify(effects, empty_message, Severity::Warning);
            return;
        }

        effects.push(Effect::Confirm {
            prompt: prompt.to_string(),
            then: Message::ClearConfirmed(target),
        });
    }

    fn clear(&mut self, effects: &mut Vec<Effect>, target: ClearTarget) {
        match target {
            ClearTarget::Chat => {
                self.conversation.clear();
                self.page.chat.messages.clear();
                self.notify(effects, "Conversation cleared", Severity::Success);
            }
            ClearTarget::History => {
                self.history.clear(self.store.as_mut());
                self.page.history_list = render::history_list(self.history.entries());
                self.notify(effects, "Search history cleared", Severity::Success);
            }
            ClearTarget::Bookmarks => {
                self.bookmarks.clear(self.store.as_mut());
                self.page.bookmarks_list = render::bookmarks_list(self.bookmarks.items());
                if let Results::Cards(cards) = &mut self.page.results {
                    cards.iter_mut().for_each(|card| card.bookmarked = false);
                }
                self.notify(effects, "Bookmarks cleared", Severity::Success);
            }
        }
    }

    fn report_health(&mut self, effects: &mut Vec<Effect>, result: Result<HealthStatus, ApiError>) {
        match result {
            Ok(status) if status.is_healthy() => {
                let version = status.version.as_deref().unwrap_or("unknown");
                self.notify(effects, format!("Backend healthy (v{})", version), Severity::Success)
            }
            Ok(status) => {
                let degraded: Vec<String> = status
                    .services
                    .iter()
                    .filter(|(_, state)| state.as_str() != "healthy")
                    .map(|(name, state)| format!("{}={}", name, state))
                    .collect();
                let text = if degraded.is_empty() {
                    format!("Backend {}", status.status)
                } else {
                    format!("Backend {}: {}", status.status, degraded.join(", "))
                };
                self.notify(effects, text, Severity::Warning)
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                self.notify(effects, "Backend unreachable", Severity::Error)
            }
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn panels(&self) -> &Panels {
        &self.panels
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.notifier.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ERROR_MARKER;
    use crate::models::fixtures::paper;
    use crate::store::MemoryStore;

    fn app() -> App {
        App::new(Box::new(MemoryStore::new()), &Config::default())
    }

    fn papers(n: usize) -> Vec<Paper> {
        (0..n)
            .map(|i| paper(&format!("2301.0000{}", i + 1), &format!("Paper {}", i + 1)))
            .collect()
    }

    fn search_ticket(effects: &[Effect]) -> SearchTicket {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Search(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .expect("search effect")
    }

    fn chat_ticket(effects: &[Effect]) -> ChatTicket {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Chat(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .expect("chat effect")
    }

    fn run_search(app: &mut App, query: &str, found: Vec<Paper>) {
        let effects = app.update(Message::Search {
            query: query.to_string(),
            limit: Some(10),
        });
        let ticket = search_ticket(&effects);
        app.update(Message::SearchFinished {
            ticket,
            result: Ok(found),
        });
    }

    fn severity(app: &App) -> Option<Severity> {
        app.toast().map(|t| t.severity)
    }

    #[test]
    fn test_search_with_results_renders_cards_and_records_history() {
        let mut app = app();
        let effects = app.update(Message::Search {
            query: "transformers".to_string(),
            limit: Some(10),
        });
        let ticket = search_ticket(&effects);
        assert_eq!(ticket.limit, 10);
        assert!(app.page().search_button.disabled);
        assert!(app.page().to_html().contains("Searching papers..."));

        app.update(Message::SearchFinished {
            ticket,
            result: Ok(papers(3)),
        });

        assert_eq!(app.page().card_count(), 3);
        assert_eq!(app.history().len(), 1);
        let head = &app.history().entries()[0];
        assert_eq!(head.query, "transformers");
        assert_eq!(head.result_count, 3);
        assert!(!app.page().search_button.disabled);
        assert_eq!(app.toast().unwrap().message, "Found 3 papers");
    }

    #[test]
    fn test_blank_search_issues_nothing() {
        let mut app = app();
        let effects = app.update(Message::Search {
            query: "   ".to_string(),
            limit: None,
        });
        assert!(!effects.iter().any(|e| matches!(e, Effect::Search(_))));
        assert!(app.history().is_empty());
        assert_eq!(severity(&app), Some(Severity::Warning));
        assert!(!app.page().search_button.disabled);
    }

    #[test]
    fn test_empty_result_shows_notice_without_history() {
        let mut app = app();
        run_search(&mut app, "nothing", vec![]);
        assert!(app.history().is_empty());
        assert!(app.page().to_html().contains("No papers found. Try a different search term."));
        assert_eq!(app.toast().unwrap().message, "No papers found");
    }

    #[test]
    fn test_failed_search_resets_button_and_reports() {
        let mut app = app();
        let effects = app.update(Message::Search {
            query: "q".to_string(),
            limit: None,
        });
        app.update(Message::SearchFinished {
            ticket: search_ticket(&effects),
            result: Err(ApiError::Status { status: 500, body: String::new() }),
        });

        assert!(!app.page().search_button.disabled);
        assert!(app.page().to_html().contains("Error searching papers. Please try again."));
        assert_eq!(severity(&app), Some(Severity::Error));
        assert!(app.history().is_empty());
    }

    #[test]
    fn test_select_send_and_answer() {
        let mut app = app();
        run_search(&mut app, "transformers", papers(1));
        app.update(Message::SelectPaper(0));
        assert_eq!(app.conversation().messages().len(), 1);

        let effects = app.update(Message::SendChat("What method did they use?".to_string()));
        let ticket = chat_ticket(&effects);
        assert_eq!(ticket.paper_id, "2301.00001");
        assert!(app.page().send_button.disabled);
        assert!(app.page().chat.loading);

        app.update(Message::ChatFinished {
            ticket,
            result: Ok(Some("They used **gradient descent**.".to_string())),
        });

        assert_eq!(app.conversation().messages().len(), 3);
        assert_eq!(app.page().chat.messages.len(), 3);
        assert!(app.page().chat.messages[2].contains("<strong>gradient descent</strong>"));
        assert!(!app.page().chat.loading);
        assert!(!app.page().send_button.disabled);
    }

    #[test]
    fn test_chat_failure_adds_one_error_message() {
        let mut app = app();
        run_search(&mut app, "q", papers(1));
        app.update(Message::SelectPaper(0));
        let ticket = chat_ticket(&app.update(Message::SendChat("hi".to_string())));

        app.update(Message::ChatFinished {
            ticket,
            result: Err(ApiError::Abandoned),
        });

        let messages = app.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].content.starts_with(ERROR_MARKER));
        assert!(!app.page().chat.loading);
        assert!(!app.page().send_button.disabled);
        assert_eq!(severity(&app), Some(Severity::Error));
    }

    #[test]
    fn test_stale_chat_response_is_dropped_after_reselect() {
        let mut app = app();
        run_search(&mut app, "q", papers(2));
        app.update(Message::SelectPaper(0));
        let ticket = chat_ticket(&app.update(Message::SendChat("hi".to_string())));

        app.update(Message::SelectPaper(1));
        assert!(!app.page().send_button.disabled);
        app.update(Message::ChatFinished {
            ticket,
            result: Ok(Some("late answer".to_string())),
        });

        assert_eq!(app.conversation().messages().len(), 1);
        assert_eq!(app.page().chat.messages.len(), 1);
        assert_eq!(app.conversation().paper().unwrap().id, "2301.00002");
    }

    #[test]
    fn test_send_without_paper_warns() {
        let mut app = app();
        let effects = app.update(Message::SendChat("hello".to_string()));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Chat(_))));
        assert_eq!(severity(&app), Some(Severity::Warning));
    }

    #[test]
    fn test_bookmark_toggle_updates_card_and_panel() {
        let mut app = app();
        run_search(&mut app, "q", papers(2));

        app.update(Message::ToggleBookmark(1));
        assert!(app.bookmarks().contains("2301.00002"));
        let Results::Cards(cards) = &app.page().results else {
            panic!("expected cards");
        };
        assert!(!cards[0].bookmarked);
        assert!(cards[1].bookmarked);
        assert!(app.page().bookmarks_list.contains("Paper 2"));

        app.update(Message::ToggleBookmark(1));
        assert!(app.bookmarks().is_empty());
        assert!(app.page().bookmarks_list.contains("No bookmarked papers yet"));
    }

    #[test]
    fn test_bookmarks_survive_restart() {
        let mut store = MemoryStore::new();
        let mut bookmarks = Bookmarks::default();
        bookmarks.toggle(&mut store, &paper("x", "Saved"), Utc::now());

        let app = App::new(Box::new(store), &Config::default());
        assert_eq!(app.bookmarks().len(), 1);
        assert!(app.page().bookmarks_list.contains("Saved"));
    }

    #[test]
    fn test_select_bookmark_closes_panels() {
        let mut app = app();
        run_search(&mut app, "q", papers(1));
        app.update(Message::ToggleBookmark(0));
        app.update(Message::ToggleBookmarks);
        assert!(app.page().bookmarks_open);

        app.update(Message::SelectBookmark(0));
        assert_eq!(app.panels().active(), Panel::None);
        assert!(!app.page().bookmarks_open);
        assert_eq!(app.conversation().paper().unwrap().id, "2301.00001");
    }

    #[test]
    fn test_repeat_search_populates_input_and_closes_panels() {
        let mut app = app();
        run_search(&mut app, "graphs", papers(1));
        app.update(Message::ToggleHistory);

        let effects = app.update(Message::RepeatSearch(0));
        let ticket = search_ticket(&effects);
        assert_eq!(ticket.query, "graphs");
        assert_eq!(app.page().search_input, "graphs");
        assert_eq!(app.panels().active(), Panel::None);
    }

    #[test]
    fn test_repeat_while_searching_leaves_input_alone() {
        let mut app = app();
        run_search(&mut app, "graphs", papers(1));

        let effects = app.update(Message::Search {
            query: "transformers".to_string(),
            limit: Some(5),
        });
        search_ticket(&effects);

        let effects = app.update(Message::RepeatSearch(0));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Search(_))));
        assert_eq!(app.page().search_input, "transformers");
        assert_eq!(app.page().limit, 5);
    }

    #[test]
    fn test_clear_history_requires_confirmation() {
        let mut app = app();
        app.update(Message::Clear(ClearTarget::History));
        assert_eq!(app.toast().unwrap().message, "No history to clear");

        run_search(&mut app, "graphs", papers(1));
        let effects = app.update(Message::Clear(ClearTarget::History));
        let then = effects
            .into_iter()
            .find_map(|e| match e {
                Effect::Confirm { then, .. } => Some(then),
                _ => None,
            })
            .expect("confirmation");
        assert_eq!(app.history().len(), 1);

        app.update(then);
        assert!(app.history().is_empty());
        assert!(app.page().history_list.contains("No search history yet"));
    }

    #[test]
    fn test_export_requires_an_exchange() {
        let mut app = app();
        run_search(&mut app, "q", papers(1));
        app.update(Message::SelectPaper(0));

        let effects = app.update(Message::ExportConversation);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Download(_))));
        assert_eq!(app.toast().unwrap().message, "No conversation to export");

        let ticket = chat_ticket(&app.update(Message::SendChat("hi".to_string())));
        app.update(Message::ChatFinished {
            ticket,
            result: Ok(Some("hello".to_string())),
        });
        let effects = app.update(Message::ExportConversation);
        let artifact = effects
            .iter()
            .find_map(|e| match e {
                Effect::Download(a) => Some(a),
                _ => None,
            })
            .expect("download");
        assert!(artifact.filename.starts_with("arxivchat_2301.00001_"));
    }

    #[test]
    fn test_toast_dismissal_ignores_replaced_toast() {
        let mut app = app();
        let first = app.update(Message::Search {
            query: String::new(),
            limit: None,
        });
        let Some(Effect::DismissToast { id: first_id, after }) = first.into_iter().next() else {
            panic!("expected dismiss effect");
        };
        assert_eq!(after, TOAST_DURATION);

        app.update(Message::SendChat(String::new()));
        app.update(Message::DismissToast(first_id));
        assert!(app.toast().is_some());
    }

    #[test]
    fn test_health_report_lists_degraded_services() {
        let mut app = app();
        let mut services = std::collections::BTreeMap::new();
        services.insert("arxiv_api".to_string(), "healthy".to_string());
        services.insert("llm_service".to_string(), "no_api_keys".to_string());
        app.update(Message::HealthChecked(Ok(HealthStatus {
            status: "degraded".to_string(),
            services,
            version: Some("1.0.0".to_string()),
        })));
        assert_eq!(app.toast().unwrap().message, "Backend degraded: llm_service=no_api_keys");
    }

    #[test]
    fn test_health_report_without_services_has_no_trailing_colon() {
        let mut app = app();
        let status: HealthStatus =
            serde_json::from_str(r#"{"status": "degraded", "error": "startup failed"}"#).unwrap();
        app.update(Message::HealthChecked(Ok(status)));
        assert_eq!(app.toast().unwrap().message, "Backend degraded");
        assert_eq!(severity(&app), Some(Severity::Warning));
    }
}
