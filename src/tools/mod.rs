//! Tools the voice model can invoke.
//!
//! Each tool is one backend action: it receives the model's arguments plus
//! the call context, runs the decision logic, and returns the prose that is
//! spoken back to the customer.

mod book_table;
mod manage_reservation;
mod tool;

pub use book_table::BookTableTool;
pub use manage_reservation::ManageReservationTool;
pub use tool::{user_message, Tool, ToolContext, ToolError, ToolSchema};
