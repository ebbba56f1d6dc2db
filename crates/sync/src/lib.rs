//! `overmark-sync` -- client-side annotation replica and sync channel.
//!
//! Each client keeps an ordered, independently-owned copy of the session's
//! annotation set. Local mutations apply optimistically and broadcast over
//! a persistent WebSocket channel; remote mutations apply identically but
//! are never re-broadcast. The channel reconnects with a fixed delay,
//! indefinitely, for the lifetime of the client session.

pub mod client;
pub mod store;

pub use client::{SyncClient, SyncConfig, SyncHandle};
pub use store::AnnotationStore;
