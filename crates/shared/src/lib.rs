//! # pushmail 共有ユーティリティ
//!
//! domain / infra の両クレートから使われる横断的な関心事を置く。
//!
//! - [`event_log`]: 配信イベントの構造化ログ
//! - [`observability`]: トレーシング初期化（`observability` feature）

pub mod event_log;
pub mod observability;

pub use observability::{LogFormat, TracingConfig};
