//! # 配信エラー定義
//!
//! メールの検証、および通知 API 呼び出しで発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **ドメインエラーのラップ**: `ValidationError` は `From` で変換する
//! - **応答の保持**: 通知 API がエラーを返した場合は応答そのものを保持する
//! - **SpanTrace 自動捕捉**: `From` 実装や convenience constructor で
//!   エラー生成時の呼び出し経路を自動記録する
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`DeliveryError`]: エラー種別（[`DeliveryErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`DeliveryErrorKind`]: エラーの具体的な種別

use std::fmt;

use derive_more::Display;
use pushmail_domain::ValidationError;
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::notification::NotificationResponse;

/// 配信時に発生するエラー
///
/// エラー種別（[`DeliveryErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
///
/// ```ignore
/// match error.kind() {
///     DeliveryErrorKind::Rejected { response } => { /* 応答を調べる */ }
///     _ => { /* その他 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct DeliveryError {
    kind:       DeliveryErrorKind,
    span_trace: SpanTrace,
}

/// 配信エラーの種別
#[derive(Debug, Error)]
pub enum DeliveryErrorKind {
    /// メールの検証に失敗
    ///
    /// 通知 API を呼び出す前に検出される。
    #[error("メールの検証に失敗: {0}")]
    Validation(#[source] ValidationError),

    /// 通知 API がエラーを含む応答を返した
    #[error("通知 API がエラーを返しました: {}", .response.error_summary())]
    Rejected {
        /// 通知 API の応答
        response: NotificationResponse,
    },

    /// 通知 API との通信に失敗
    ///
    /// クライアント実装が通信エラーを報告するために使う。
    #[error("通知 API との通信に失敗: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &DeliveryErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Rejected バリアントの場合、通知 API の応答を返す
    pub fn response(&self) -> Option<&NotificationResponse> {
        match &self.kind {
            DeliveryErrorKind::Rejected { response } => Some(response),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (DeliveryErrorKind, SpanTrace) {
        (self.kind, self.span_trace)
    }

    // ===== Convenience constructors =====

    /// 通知 API のエラー応答からエラーを生成する
    pub fn rejected(response: NotificationResponse) -> Self {
        Self {
            kind:       DeliveryErrorKind::Rejected { response },
            span_trace: SpanTrace::capture(),
        }
    }

    /// 通信エラーを生成する
    pub fn transport(msg: impl Into<String>) -> Self {
        Self {
            kind:       DeliveryErrorKind::Transport(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<ValidationError> for DeliveryError {
    fn from(source: ValidationError) -> Self {
        Self {
            kind:       DeliveryErrorKind::Validation(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_validation_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_deliver");
            let _enter = span.enter();

            let err: DeliveryError = ValidationError::MissingTemplateForSentinelSubject.into();

            assert!(matches!(
                err.kind(),
                DeliveryErrorKind::Validation(ValidationError::MissingTemplateForSentinelSubject)
            ));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_deliver"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_rejectedは応答を保持する() {
        let response = NotificationResponse {
            errors: Some(json!(["All included players are not subscribed"])),
            ..Default::default()
        };

        let err = DeliveryError::rejected(response.clone());

        assert_eq!(err.response(), Some(&response));
        assert_eq!(
            err.to_string(),
            r#"通知 API がエラーを返しました: ["All included players are not subscribed"]"#
        );
    }

    #[test]
    fn test_transportのメッセージ() {
        let err = DeliveryError::transport("タイムアウト");

        assert!(matches!(err.kind(), DeliveryErrorKind::Transport(msg) if msg == "タイムアウト"));
        assert_eq!(err.response(), None);
    }

    #[test]
    fn test_sourceがdelivery_error_kindに委譲する() {
        use std::error::Error;

        let err: DeliveryError = ValidationError::MissingTemplateForSentinelSubject.into();

        assert!(err.source().is_some());
    }
}
