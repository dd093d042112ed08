//! # Pushmail ドメイン層
//!
//! メーラーが生成したメールを、プッシュ/メール通知 API の通知リクエストへ
//! 変換するためのドメインモデルとマッピングロジックを定義する。
//!
//! ## 設計方針
//!
//! - **純粋な変換**: I/O・ログ出力・グローバル状態を持たない
//! - **型による不変条件**: 宛先モードの排他性を enum で表現する
//! - **ドメインエラー**: マッピング時の検証失敗を列挙型で明示する
//!
//! ## 依存関係の方向
//!
//! ```text
//! infra → domain
//! ```
//!
//! ドメイン層は外部サービス（通知 API、設定、ログ基盤）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`mail`] - 受信メール（送信元・宛先・件名・本文・カスタムフィールド）
//! - [`notification`] - 通知 API へ渡す通知リクエスト
//! - [`mapping`] - メール → 通知リクエストのフィールドマッパー
//! - [`error`] - 検証エラーの定義
//!
//! ## 使用例
//!
//! ```rust
//! use pushmail_domain::{mail::MailMessage, mapping::FieldMapper};
//!
//! let mail = MailMessage::builder()
//!     .from("Sender <sender@example.com>")
//!     .to("user@example.com")
//!     .subject("こんにちは")
//!     .build()
//!     .unwrap();
//!
//! let request = FieldMapper::new("00000000-0000-0000-0000-000000000000")
//!     .map(&mail)
//!     .unwrap();
//!
//! assert_eq!(
//!     request.include_email_tokens(),
//!     Some(&["user@example.com".to_string()][..])
//! );
//! ```

pub mod error;
pub mod mail;
pub mod mapping;
pub mod notification;

pub use error::{AddressError, ValidationError};
