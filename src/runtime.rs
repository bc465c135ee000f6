//! Carries out the effects requested by [`App::update`] and feeds the
//! results back in as messages.
//!
//! Everything that touches `App` runs on one task. Network calls run as
//! spawned tasks and report back over a channel; each of them holds a
//! [`CompletionGuard`] so the app hears back exactly once even if the task
//! dies early.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::api::Backend;
use crate::app::{App, Effect, Message};
use crate::command::{self, Command, USAGE};
use crate::error::ApiError;
use crate::models::Role;
use crate::ui::ToastId;

/// Sends `fallback` on drop unless [`complete`](Self::complete) was called.
pub struct CompletionGuard {
    tx: UnboundedSender<Message>,
    fallback: Option<Message>,
}

impl CompletionGuard {
    pub fn new(tx: UnboundedSender<Message>, fallback: Message) -> Self {
        CompletionGuard {
            tx,
            fallback: Some(fallback),
        }
    }

    pub fn complete(mut self, message: Message) {
        self.fallback = None;
        if self.tx.send(message).is_err() {
            debug!("event loop gone, dropping completion");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(message) = self.fallback.take() {
            let _ = self.tx.send(message);
        }
    }
}

fn decode_line(bytes: Vec<u8>) -> String {
    let line = match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => {
            warn!("input line is not valid UTF-8, replacing bad bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    line.trim_end_matches(['\r', '\n']).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Runtime {
    backend: Arc<dyn Backend>,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    page_path: PathBuf,
    downloads_dir: PathBuf,
    last_page: String,
    last_toast: Option<ToastId>,
    pending_confirmation: Option<Message>,
}

impl Runtime {
    pub fn new(backend: Arc<dyn Backend>, page_path: PathBuf, downloads_dir: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Runtime {
            backend,
            tx,
            rx,
            page_path,
            downloads_dir,
            last_page: String::new(),
            last_toast: None,
            pending_confirmation: None,
        }
    }

    pub fn page_path(&self) -> &Path {
        &self.page_path
    }

    /// Reads commands from stdin until `quit` or end of input.
    pub async fn run(self, app: &mut App) -> Result<()> {
        self.run_with(app, BufReader::new(tokio::io::stdin())).await
    }

    pub async fn run_with<R>(mut self, app: &mut App, mut input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.write_page(app);
        println!("Page: {}", self.page_path.display());
        println!("{}", USAGE);

        // `read_until` keeps partial input in `buf` when the other branch wins,
        // so it is only cleared once a full line has been taken.
        let mut buf = Vec::new();
        loop {
            tokio::select! {
                read = input.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        break;
                    }
                    let line = decode_line(std::mem::take(&mut buf));
                    if self.handle_line(app, &line) == Flow::Quit {
                        break;
                    }
                }
                Some(message) = self.rx.recv() => self.dispatch(app, message),
            }
        }

        Ok(())
    }

    /// Waits for the next completion from a spawned task.
    pub async fn next_message(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn handle_line(&mut self, app: &mut App, line: &str) -> Flow {
        if let Some(then) = self.pending_confirmation.take() {
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => self.dispatch(app, then),
                _ => println!("Cancelled."),
            }
            return Flow::Continue;
        }

        if line.trim().is_empty() {
            return Flow::Continue;
        }

        match command::parse(line) {
            Ok(Command::App(message)) => self.dispatch(app, message),
            Ok(Command::Help) => println!("{}", USAGE),
            Ok(Command::Quit) => return Flow::Quit,
            Err(e) => println!("{}", e),
        }
        Flow::Continue
    }

    pub fn dispatch(&mut self, app: &mut App, message: Message) {
        let show_results = matches!(message, Message::SearchFinished { .. });
        let show_reply = matches!(message, Message::ChatFinished { .. });
        let messages_before = app.conversation().messages().len();

        let effects = app.update(message);
        for effect in effects {
            self.execute(effect);
        }

        if show_results {
            for (i, paper) in app.papers().iter().enumerate() {
                println!("  {:>2}. {} ({})", i + 1, paper.title, paper.id);
            }
        }
        if show_reply && app.conversation().messages().len() > messages_before {
            if let Some(reply) = app.conversation().messages().last() {
                if reply.role == Role::Assistant {
                    println!("\n{}\n", reply.content);
                }
            }
        }

        if let Some(toast) = app.toast() {
            if self.last_toast != Some(toast.id) {
                println!("[{}] {}", toast.severity.as_str(), toast.message);
                self.last_toast = Some(toast.id);
            }
        }
        self.write_page(app);
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Search(ticket) => {
                let backend = self.backend.clone();
                let guard = CompletionGuard::new(
                    self.tx.clone(),
                    Message::SearchFinished {
                        ticket: ticket.clone(),
                        result: Err(ApiError::Abandoned),
                    },
                );
                tokio::spawn(async move {
                    let result = backend.search(&ticket.query, ticket.limit).await;
                    guard.complete(Message::SearchFinished { ticket, result });
                });
            }
            Effect::Chat(ticket) => {
                let backend = self.backend.clone();
                let guard = CompletionGuard::new(
                    self.tx.clone(),
                    Message::ChatFinished {
                        ticket: ticket.clone(),
                        result: Err(ApiError::Abandoned),
                    },
                );
                tokio::spawn(async move {
                    let result = tokio::select! {
                        _ = ticket.cancel.cancelled() => Err(ApiError::Cancelled),
                        result = backend.chat(&ticket.paper_id, &ticket.message) => result,
                    };
                    guard.complete(Message::ChatFinished { ticket, result });
                });
            }
            Effect::CheckHealth => {
                let backend = self.backend.clone();
                let guard = CompletionGuard::new(
                    self.tx.clone(),
                    Message::HealthChecked(Err(ApiError::Abandoned)),
                );
                tokio::spawn(async move {
                    let result = backend.health().await;
                    guard.complete(Message::HealthChecked(result));
                });
            }
            Effect::Download(artifact) => {
                let path = self.downloads_dir.join(&artifact.filename);
                let written = std::fs::create_dir_all(&self.downloads_dir)
                    .and_then(|_| std::fs::write(&path, &artifact.contents));
                match written {
                    Ok(()) => println!("Saved {}", path.display()),
                    Err(e) => {
                        let _ = self.tx.send(Message::DownloadFailed {
                            filename: artifact.filename,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Effect::Confirm { prompt, then } => {
                println!("{} (y/N)", prompt);
                self.pending_confirmation = Some(then);
            }
            Effect::DismissToast { id, after } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Message::DismissToast(id));
                });
            }
        }
    }

    fn write_page(&mut self, app: &App) {
        let html = app.page().to_html();
        if html == self.last_page {
            return;
        }

        if let Some(dir) = self.page_path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("could not create {}: {}", dir.display(), e);
            }
        }
        match std::fs::write(&self.page_path, &html) {
            Ok(()) => self.last_page = html,
            Err(e) => warn!("could not write page to {}: {}", self.page_path.display(), e),
        }
    }
}
