//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，不做具体的解析判断。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor::App (按运行模式调度，处理 Vec<test_id>)
//!     ↓
//! services (能力层：download / parse / search，一次一个页面)
//!     ↓
//! extraction (纯函数解析引擎)
//!     ↓
//! infrastructure / clients (页面缓存、记录存储、HTTP)
//! ```

pub mod batch_processor;

pub use batch_processor::{App, ParseStats};
