//! Voice assistant backend for restaurant phone reservations.
//!
//! Receives webhook calls from a voice-AI telephony platform, resolves which
//! restaurant owns the call, supplies the system prompt and tool definitions
//! to the model driving the conversation, and executes the reservation tools
//! on the model's behalf.

pub mod config;
pub mod db;
pub mod error;
pub mod prompt;
pub mod reservations;
pub mod server;
pub mod temporal;
pub mod tools;
pub mod vapi;
