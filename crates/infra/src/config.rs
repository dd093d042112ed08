//! # 通知 API 設定
//!
//! 環境変数から通知 API のデフォルト設定を読み込む。
//!
//! ## 環境変数一覧
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|------------|------|
//! | `ONESIGNAL_APP_ID` | No | 空文字列 | デフォルトのアプリケーション ID |
//! | `ONESIGNAL_APP_KEY` | No | 空文字列 | デフォルトの API キー |
//!
//! 設定は起動時に一度だけ構築し、[`DeliveryMethod`](crate::delivery::DeliveryMethod)
//! へ値として渡す。グローバルな状態は持たない。

use std::{env, fmt};

use derive_more::From;

/// アプリケーション ID の環境変数名
pub const APP_ID_ENV: &str = "ONESIGNAL_APP_ID";
/// API キーの環境変数名
pub const APP_KEY_ENV: &str = "ONESIGNAL_APP_KEY";

/// 通知 API の API キー
///
/// ログに出ないよう `Debug` では値を伏せる。
#[derive(Clone, PartialEq, Eq, From)]
pub struct AppKey(String);

impl AppKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// API キーの値を取り出す（クライアント実装向け）
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppKey(***)")
    }
}

/// 通知 API の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// デフォルトのアプリケーション ID
    pub app_id:  String,
    /// デフォルトの API キー
    pub app_key: AppKey,
}

impl NotificationConfig {
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id:  app_id.into(),
            app_key: AppKey::new(app_key),
        }
    }

    /// 環境変数から設定を読み込む
    ///
    /// 未設定の変数は空文字列として扱う。
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            lookup(APP_ID_ENV).unwrap_or_default(),
            lookup(APP_KEY_ENV).unwrap_or_default(),
        )
    }
}
