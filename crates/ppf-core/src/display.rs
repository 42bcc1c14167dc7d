//! Display formatting and result types.
//!
//! Domain models implement [`std::fmt::Display`] as markdown; collections and
//! operation outcomes get newtype wrappers here. The CLI renders the markdown
//! in the terminal and the MCP server returns it as text content.
//!
//! ```rust
//! use ppf_core::display::OperationStatus;
//!
//! let status = OperationStatus::success("Draft saved".to_string());
//! assert!(status.to_string().contains("Success:"));
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;

pub use collections::{Interventions, Photos, Steps, Uploads};
pub use datetime::LocalDateTime;
pub use status::OperationStatus;
