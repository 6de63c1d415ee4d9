//! groupgraph core library
//!
//! Entity records, response envelope decoding, settings and the
//! data-source seam shared by the API client and the graph sync.

pub mod envelope;
pub mod error;
pub mod model;
pub mod settings;
pub mod source;

pub use error::{GgResult, GroupGraphError};
pub use settings::Settings;
pub use source::{GroupSource, MessageCursor};
