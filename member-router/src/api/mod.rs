//! Handlers for the operations of the dispatch table.

pub mod campaigns;
pub mod members;
pub mod projects;
pub mod sender_details;
pub mod utils;
