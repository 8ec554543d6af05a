//! 基础设施层
//!
//! 持有磁盘上的稀缺资源，只暴露读写能力：
//! - `PageStore` - HTML 页面缓存和下载进度
//! - `RecordStore` - 解析结果

pub mod page_store;
pub mod record_store;

pub use page_store::PageStore;
pub use record_store::RecordStore;
