//! # groupgraph API
//!
//! Client for the GroupMe v3 REST API. Covers the group, member and message
//! endpoints and implements [`groupgraph_core::GroupSource`] for the sync driver.

pub mod client;
pub mod requests;

pub use client::{GroupMeClient, MAX_MESSAGE_LIMIT, REQUEST_TIMEOUT};
pub use requests::{AddMember, GroupUpdate, NewGroup};
