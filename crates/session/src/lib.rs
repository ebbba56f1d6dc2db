//! `overmark-session` -- overlay session orchestration and render loop.
//!
//! Wires a caller-owned detector, the camera, the strategy runner, and the
//! sync channel into one [`OverlaySession`], and composes the latest shared
//! state into [`OverlayFrame`]s on a fixed display cadence. The render loop
//! is purely a consumer: nothing in the workspace depends on it.

pub mod render;
pub mod session;

pub use render::{compose, Marker, OverlayFrame};
pub use session::{OverlaySession, SessionConfig, SessionError};
