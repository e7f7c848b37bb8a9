//! 服务层
//!
//! - `driver`: 页面能力接口
//! - `notebooklm`: 基于 chromiumoxide 的页面实现
//! - `storefront`: 电子书领取
//! - `transcoder`: 音频转码

pub mod driver;
pub mod notebooklm;
pub mod storefront;
pub mod transcoder;

pub use driver::{AudioHandle, AudioSpec, NotebookDriver, SessionLauncher};
pub use notebooklm::{ChromeLauncher, NotebookLmPage};
pub use storefront::{ClaimedTitle, EntitlementClaimer, StorefrontClaimer};
pub use transcoder::{AudioFormat, FfmpegTranscoder, TranscodeError, Transcoder};
