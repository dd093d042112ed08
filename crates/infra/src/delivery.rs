//! # 配信メソッド
//!
//! メーラーから受け取ったメールを通知 API 経由で配信する。
//!
//! ## 処理の流れ
//!
//! 1. 設定の解決: アプリケーション ID と API キーは [`DeliverySettings`] の
//!    上書き値を優先し、なければ [`NotificationConfig`] を使う
//! 2. マッピング: ドメイン層の [`FieldMapper`] で通知リクエストを作る
//! 3. 送信: `perform_send_request` が有効なら [`NotificationClient`] で送る
//! 4. 応答の検査: 応答がエラーを含めば [`DeliveryErrorKind::Rejected`] で失敗する
//!
//! 検証エラーは送信前に返るため、失敗時に通知 API が呼ばれることはない。
//!
//! [`DeliveryErrorKind::Rejected`]: crate::error::DeliveryErrorKind::Rejected

use std::sync::Arc;

use pushmail_domain::{
    mail::MailMessage,
    mapping::FieldMapper,
    notification::NotificationRequest,
};
use pushmail_shared::{event_log::event, log_business_event};

use crate::{
    config::{AppKey, NotificationConfig},
    error::DeliveryError,
    notification::{NotificationClient, NotificationResponse},
};

/// 配信ごとの設定
///
/// 既定値は「送信する・上書きなし」。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    /// `false` の場合は送信せず、通知リクエストだけを返す
    pub perform_send_request: bool,
    /// 設定のアプリケーション ID より優先する値
    pub app_id:               Option<String>,
    /// 設定の API キーより優先する値
    pub app_key:              Option<AppKey>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            perform_send_request: true,
            app_id:               None,
            app_key:              None,
        }
    }
}

/// 配信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// 送信せずに組み立てた通知リクエスト
    Prepared(NotificationRequest),
    /// 送信済みの通知リクエストと API の応答
    Sent {
        request:  NotificationRequest,
        response: NotificationResponse,
    },
}

impl Delivery {
    pub fn request(&self) -> &NotificationRequest {
        match self {
            Self::Prepared(request) | Self::Sent { request, .. } => request,
        }
    }

    pub fn response(&self) -> Option<&NotificationResponse> {
        match self {
            Self::Prepared(_) => None,
            Self::Sent { response, .. } => Some(response),
        }
    }
}

/// 配信メソッド
///
/// 1 通のメールにつき 1 件の通知を作成する。状態は持たず、
/// 複数タスクから同時に呼び出せる。
pub struct DeliveryMethod {
    config:   NotificationConfig,
    settings: DeliverySettings,
    client:   Arc<dyn NotificationClient>,
}

impl DeliveryMethod {
    pub fn new(
        config: NotificationConfig,
        settings: DeliverySettings,
        client: Arc<dyn NotificationClient>,
    ) -> Self {
        Self {
            config,
            settings,
            client,
        }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// メールを配信する
    ///
    /// # エラー
    ///
    /// - メールの検証に失敗: `DeliveryErrorKind::Validation`
    /// - 通知 API がエラー応答を返した: `DeliveryErrorKind::Rejected`
    /// - クライアントが通信エラーを返した: `DeliveryErrorKind::Transport`
    #[tracing::instrument(skip_all, fields(recipients = mail.to_addresses().len()))]
    pub async fn deliver(&self, mail: &MailMessage) -> Result<Delivery, DeliveryError> {
        let mapper = FieldMapper::new(self.config.app_id.as_str())
            .with_app_id_override(self.settings.app_id.clone());

        let request = mapper.map(mail).map_err(|e| {
            tracing::warn!(error = %e, "メールを通知リクエストに変換できません");
            DeliveryError::from(e)
        })?;

        if !self.settings.perform_send_request {
            tracing::debug!(app_id = %request.app_id, "送信せずに通知リクエストを返す");
            return Ok(Delivery::Prepared(request));
        }

        let app_key = self
            .settings
            .app_key
            .as_ref()
            .unwrap_or(&self.config.app_key);

        let outcome = match self.client.create_notification(app_key, &request).await {
            Ok(response) if response.has_errors() => Err(DeliveryError::rejected(response)),
            other => other,
        };

        match outcome {
            Ok(response) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::NOTIFICATION,
                    event.entity_id = response.id.as_deref().unwrap_or_default(),
                    event.result = event::result::SUCCESS,
                    notification.app_id = %request.app_id,
                    "通知送信成功"
                );
                Ok(Delivery::Sent { request, response })
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::NOTIFICATION,
                    event.result = event::result::FAILURE,
                    notification.app_id = %request.app_id,
                    error = %e,
                    "通知送信失敗"
                );
                Err(e)
            }
        }
    }
}
