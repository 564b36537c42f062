//! Real-time screen + system-audio recorder: capture -> JPEG encode -> AVI
//! mux, connected by bounded SPSC queues and throttled by an adaptive
//! frame-rate controller.
//!
//! This crate is the core pipeline only. The entitlement check, the
//! interactive front end's flag parsing beyond the documented surface, and
//! platform-specific capture backends are modeled as trait seams
//! ([`capture::DisplayCapture`], [`audio::LoopbackCapture`], [`auth::EntitlementGate`])
//! with a single in-process stub implementation each.

pub mod audio;
pub mod auth;
pub mod avi;
pub mod capture;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod packet;
pub mod pool;
pub mod ring;
pub mod session;
pub mod stats;

pub use config::{Args, Config};
pub use error::RecorderError;
pub use session::{Session, SessionHandle};
pub use stats::StatsSnapshot;
