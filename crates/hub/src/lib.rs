//! `overmark-hub` -- annotation relay hub.
//!
//! A small Axum server that accepts one WebSocket per client at
//! `/ws/{client_id}` and relays every valid annotation envelope to all
//! other connected clients. The hub keeps no annotation state of its own;
//! clients that join late start from an empty replica.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
