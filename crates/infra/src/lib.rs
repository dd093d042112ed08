//! # Pushmail インフラ層
//!
//! メールを通知 API 経由で配信するための接続部分を担当する。
//!
//! ## 設計方針
//!
//! このクレートはドメイン層のフィールドマッパーを呼び出し、その結果を
//! 通知 API クライアントへ渡す。通知 API との通信方法は
//! [`NotificationClient`] trait で抽象化し、HTTP 通信やリトライは
//! trait の実装側（生成された API クライアント）に任せる。
//!
//! ## 責務
//!
//! - **設定**: 環境変数からデフォルトのアプリケーション ID と API キーを読む
//! - **配信**: 設定の解決 → マッピング → 送信 → 応答の検査
//! - **クライアント抽象**: 通知 API クライアントの trait と Noop 実装
//!
//! ## 依存関係
//!
//! ```text
//! infra → domain
//!   ↓
//! shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`config`] - 通知 API の設定
//! - [`delivery`] - 配信メソッド
//! - [`error`] - 配信エラー定義
//! - [`notification`] - 通知 API クライアント trait
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use pushmail_infra::{
//!     config::NotificationConfig,
//!     delivery::{DeliveryMethod, DeliverySettings},
//!     notification::NoopNotificationClient,
//! };
//!
//! let method = DeliveryMethod::new(
//!     NotificationConfig::from_env(),
//!     DeliverySettings::default(),
//!     Arc::new(NoopNotificationClient),
//! );
//! let delivery = method.deliver(&mail).await?;
//! ```

pub mod config;
pub mod delivery;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;

pub use config::{AppKey, NotificationConfig};
pub use delivery::{Delivery, DeliveryMethod, DeliverySettings};
pub use error::{DeliveryError, DeliveryErrorKind};
pub use notification::{NoopNotificationClient, NotificationClient, NotificationResponse};
