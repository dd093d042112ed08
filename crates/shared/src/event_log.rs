//! # 配信イベントの構造化ログ
//!
//! 配信結果を `jq` で絞り込めるよう、フィールド名と値を定数で揃える。
//!
//! [`log_business_event!`] は `event.kind = "business_event"` を自動付与するので、
//! `jq 'select(.["event.kind"] == "business_event")'` で配信イベントだけを抽出できる。
//!
//! フィールド名はドット記法（`event.category`、`notification.app_id`）を使う。
//! JSON 出力ではフラットなキーになる。

/// ビジネスイベントを `info` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: [`event::category`] の定数
/// - `event.action`: [`event::action`] の定数
/// - `event.result`: [`event::result`] の定数
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: [`event::entity_type`] の定数
/// - `event.entity_id`: 通知 API が採番した通知 ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
    }

    pub mod action {
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
    }

    pub mod entity_type {
        pub const NOTIFICATION: &str = "notification";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}
