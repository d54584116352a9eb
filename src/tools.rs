//! Tools the model can request by name, and the registry that dispatches them.

pub mod traits;
pub mod error;
pub mod schema;
pub mod params;
pub mod result;
pub mod registry;
pub mod function;
pub mod snapshot;
mod macros;

pub use traits::Tool;
pub use error::ToolError;
pub use schema::{ArgSchema, ToolSchema};
pub use params::ToolParams;
pub use result::ToolResult;
pub use registry::ToolRegistry;
pub use function::FnTool;
pub use snapshot::{SnapshotCell, SnapshotTool};
