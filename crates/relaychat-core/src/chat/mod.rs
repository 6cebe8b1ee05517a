//! Chat session persistence abstractions.
//!
//! - `SessionRepository`: durable owner-scoped CRUD, implemented in infra
//! - `SessionStore`: the gateway surface used by clients
//! - `SessionService`: the in-process gateway over a repository
//! - `derive_title`: the title rule applied on every save

pub mod repository;
pub mod service;
pub mod store;
pub mod title;
