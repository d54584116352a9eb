//! ReAct agent runtime: a Thought/Action/Observation loop over interchangeable
//! text providers, with a shared tool registry and a process-wide concurrency
//! gate for provider calls.

pub mod llm;
pub mod tools;
pub mod agent;
pub mod parser;
pub mod concurrency;
pub mod message;
pub mod config;
pub mod logging;
pub mod error;
pub mod prelude;

// re-export the proc-macro attribute for convenient use: `use rimagent::tool;` or `#[rimagent::tool(...)]`
pub use rimagent_macros::tool;

// paths the `#[tool]` expansion refers to
#[doc(hidden)]
pub use async_trait;
#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;

pub use error::{Error, Result};
