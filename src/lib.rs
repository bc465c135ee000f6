pub mod api;
pub mod app;
pub mod bookmarks;
pub mod command;
pub mod config;
pub mod conversation;
pub mod error;
pub mod export;
pub mod history;
pub mod models;
pub mod page;
pub mod render;
pub mod runtime;
pub mod search;
pub mod store;
pub mod ui;
