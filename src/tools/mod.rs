//! 工具层：Tool trait、注册表、带超时与审计日志的执行器，以及内置工具
//!
//! ls / read_file / write_file 作用于虚拟工作区，write_todos / read_todos 作用于任务清单，
//! task 把工作委派给子智能体。

pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod schema;
pub mod search;
pub mod task;
pub mod think;
pub mod todos;

pub use executor::{ToolExecutor, DEFAULT_TOOL_TIMEOUT_SECS};
pub use filesystem::{LsTool, ReadFileTool, WriteFileTool};
pub use registry::{Tool, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use search::{SearchBackend, SearchHit, SearchTool, WebFetchBackend};
pub use task::TaskTool;
pub use think::ThinkTool;
pub use todos::{ReadTodosTool, WriteTodosTool};
