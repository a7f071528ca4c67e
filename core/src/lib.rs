pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod store;
pub mod tools;

pub use error::{StoreError, StoreResult};
pub use report::ToolOutput;
pub use store::{NutritionStore, StoreConfig};
pub use tools::{Tool, ToolDefinition, ToolError, call_tool, tool_definitions};
