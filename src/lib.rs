//! Presentation day scheduling for NGO project reviews.
//!
//! The [`engine`] turns a working window into presentation slots and keeps the
//! slot/project assignment consistent while an operator edits it. The rest of
//! the crate serves that engine: [`db`] persists projects and finished
//! schedules, [`api`] exposes them over HTTP, [`client`] talks to that API and
//! [`session`] ties a single editing session to either of them.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod session;
