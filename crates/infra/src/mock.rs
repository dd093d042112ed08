//! # テスト用モック通知クライアント
//!
//! 配信テストで使用するインメモリのモッククライアント。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! pushmail-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pushmail_domain::notification::NotificationRequest;

use crate::{
    config::AppKey,
    error::DeliveryError,
    notification::{NotificationClient, NotificationResponse},
};

/// 送信内容を記録するモック通知クライアント
///
/// 既定では空の成功応答を返す。
#[derive(Clone, Default)]
pub struct MockNotificationClient {
    calls:    Arc<Mutex<Vec<(AppKey, NotificationRequest)>>>,
    response: NotificationResponse,
    failure:  Option<String>,
}

impl MockNotificationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した応答を返すモックを作る
    pub fn with_response(response: NotificationResponse) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }

    /// 常に通信エラーを返すモックを作る
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// 受け取ったリクエスト
    pub fn sent_requests(&self) -> Vec<NotificationRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// 受け取った API キー
    pub fn used_app_keys(&self) -> Vec<AppKey> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationClient for MockNotificationClient {
    async fn create_notification(
        &self,
        app_key: &AppKey,
        request: &NotificationRequest,
    ) -> Result<NotificationResponse, DeliveryError> {
        self.calls
            .lock()
            .unwrap()
            .push((app_key.clone(), request.clone()));

        match &self.failure {
            Some(message) => Err(DeliveryError::transport(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}
