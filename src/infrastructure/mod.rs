pub mod downloads;
pub mod js_executor;

pub use downloads::DownloadWatcher;
pub use js_executor::JsExecutor;
