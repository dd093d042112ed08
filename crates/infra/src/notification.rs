//! # 通知 API クライアント
//!
//! 通知リクエストを通知 API へ送る部分を抽象化する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationClient` trait で通知 API 呼び出しを抽象化
//! - **通信は実装側の責務**: HTTP 通信・タイムアウト・リトライは生成された API
//!   クライアントをラップする実装が担う
//! - **Noop 実装**: 送信せずにログ出力のみ行う実装を提供する

mod noop;

use async_trait::async_trait;
pub use noop::NoopNotificationClient;
use pushmail_domain::notification::NotificationRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::AppKey, error::DeliveryError};

/// 通知 API クライアントトレイト
///
/// 1 回の呼び出しで 1 件の通知を作成する。
#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// 通知を作成する
    ///
    /// 通信に失敗した場合は `DeliveryErrorKind::Transport` を返す。
    /// API がエラーを含む応答を返した場合は、その応答を `Ok` で返す
    /// （エラー判定は呼び出し元が行う）。
    async fn create_notification(
        &self,
        app_key: &AppKey,
        request: &NotificationRequest,
    ) -> Result<NotificationResponse, DeliveryError>;
}

/// 通知 API の応答
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    /// 作成された通知の ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id:          Option<String>,
    /// 配信対象の件数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients:  Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// API が報告したエラー（配列またはオブジェクト）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors:      Option<Value>,
}

impl NotificationResponse {
    /// 応答がエラーを含むか
    ///
    /// `null`・空配列・空オブジェクトはエラーなしとみなす。
    pub fn has_errors(&self) -> bool {
        match &self.errors {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// ログやエラーメッセージ用のエラー要約
    pub fn error_summary(&self) -> String {
        self.errors
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    }
}
