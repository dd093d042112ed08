//! Noop 通知クライアント実装
//!
//! 通知 API を呼び出さず、ログ出力のみ行う。
//! テスト環境や配信無効化時に使用する。

use async_trait::async_trait;
use pushmail_domain::notification::NotificationRequest;

use super::{NotificationClient, NotificationResponse};
use crate::{config::AppKey, error::DeliveryError};

/// Noop 通知クライアント（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationClient;

#[async_trait]
impl NotificationClient for NoopNotificationClient {
    async fn create_notification(
        &self,
        _app_key: &AppKey,
        request: &NotificationRequest,
    ) -> Result<NotificationResponse, DeliveryError> {
        tracing::info!(
            app_id = %request.app_id,
            subject = request.email_subject.as_deref().unwrap_or_default(),
            template_id = request.template_id.as_deref().unwrap_or_default(),
            "Noop: 通知送信をスキップ"
        );
        Ok(NotificationResponse::default())
    }
}

#[cfg(test)]
mod tests {
    use pushmail_domain::notification::Audience;

    use super::*;

    #[tokio::test]
    async fn create_notificationがエラーなしの応答を返す() {
        let client = NoopNotificationClient;
        let request = NotificationRequest::new(
            "app",
            Audience::EmailTokens {
                include_email_tokens: vec!["test@example.com".to_string()],
            },
        );

        let response = client
            .create_notification(&AppKey::new("key"), &request)
            .await
            .unwrap();

        assert!(!response.has_errors());
    }
}
