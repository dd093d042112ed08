//! # 通知リクエスト
//!
//! 通知 API のクライアントへ渡す通知リクエストを定義する。
//!
//! ## 設計方針
//!
//! - **宛先モードの排他**: メールトークン宛先と上書き宛先（外部ユーザー ID・
//!   プレイヤー ID・セグメント）は [`Audience`] の別バリアントとし、
//!   両方が同時に設定される状態を型で排除する
//! - **追加パラメータは閉じた集合**: `custom_notification_args` で設定できるキーは
//!   [`NotificationArg`] に列挙したものだけ。任意フィールドへの動的代入はしない
//! - **serde でシリアライズ**: 未設定フィールドは出力しない
//!
//! ## 追加パラメータ一覧
//!
//! | キー | 値の型 |
//! |-----|-------|
//! | `external_id` | 文字列 |
//! | `name` | 文字列 |
//! | `send_after` | 文字列 |
//! | `delayed_option` | 文字列（`timezone` / `last-active`） |
//! | `delivery_time_of_day` | 文字列（例: `9:00AM`） |
//! | `throttle_rate_per_minute` | 0 以上の整数 |
//! | `disable_email_click_tracking` | 真偽値 |
//! | `email_preheader` | 文字列 |
//! | `include_unsubscribed` | 真偽値 |

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use strum::{EnumString, IntoStaticStr};

use crate::error::ValidationError;

/// 外部ユーザー ID 宛先で使うチャネル
pub const EMAIL_CHANNEL: &str = "email";

/// 通知リクエスト
///
/// フィールドマッパーが 1 通のメールにつき 1 つ生成し、所有権は呼び出し元へ渡る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub app_id:             String,
    /// メール通知では常に `false`
    pub is_ios:             bool,
    #[serde(flatten)]
    pub audience:           Audience,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_from_name:    Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject:      Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_body:         Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id:        Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data:        Option<Value>,
    #[serde(flatten)]
    pub options:            NotificationOptions,
}

impl NotificationRequest {
    /// 宛先とアプリケーション ID だけを持つリクエストを作成する
    pub fn new(app_id: impl Into<String>, audience: Audience) -> Self {
        Self {
            app_id: app_id.into(),
            is_ios: false,
            audience,
            email_from_address: None,
            email_from_name: None,
            email_subject: None,
            email_body: None,
            template_id: None,
            custom_data: None,
            options: NotificationOptions::default(),
        }
    }

    pub fn include_email_tokens(&self) -> Option<&[String]> {
        self.audience.email_tokens()
    }

    pub fn include_external_user_ids(&self) -> Option<&[String]> {
        self.audience
            .targeted()
            .and_then(|t| t.include_external_user_ids.as_deref())
    }

    pub fn channel_for_external_user_ids(&self) -> Option<&str> {
        self.audience
            .targeted()
            .and_then(|t| t.channel_for_external_user_ids.as_deref())
    }

    pub fn include_player_ids(&self) -> Option<&[String]> {
        self.audience
            .targeted()
            .and_then(|t| t.include_player_ids.as_deref())
    }

    pub fn included_segments(&self) -> Option<&[String]> {
        self.audience
            .targeted()
            .and_then(|t| t.included_segments.as_deref())
    }

    pub fn excluded_segments(&self) -> Option<&[String]> {
        self.audience
            .targeted()
            .and_then(|t| t.excluded_segments.as_deref())
    }
}

/// 宛先
///
/// メールの宛先から作る「メールモード」と、カスタムフィールドから作る
/// 「上書きモード」のどちらか一方だけが有効になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Audience {
    /// メールモード: 宛先アドレスをメールトークンとして使う
    EmailTokens { include_email_tokens: Vec<String> },
    /// 上書きモード: 通知 API 側の宛先指定を使う
    Targeted(TargetedAudience),
}

impl Audience {
    pub fn email_tokens(&self) -> Option<&[String]> {
        match self {
            Self::EmailTokens {
                include_email_tokens,
            } => Some(include_email_tokens),
            Self::Targeted(_) => None,
        }
    }

    pub fn targeted(&self) -> Option<&TargetedAudience> {
        match self {
            Self::Targeted(targeted) => Some(targeted),
            Self::EmailTokens { .. } => None,
        }
    }
}

/// 上書きモードの宛先
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetedAudience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_external_user_ids:     Option<Vec<String>>,
    /// `include_external_user_ids` がある場合は [`EMAIL_CHANNEL`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_for_external_user_ids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_player_ids:            Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_segments:             Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_segments:             Option<Vec<String>>,
}

/// `custom_notification_args` で設定できるキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationArg {
    ExternalId,
    Name,
    SendAfter,
    DelayedOption,
    DeliveryTimeOfDay,
    ThrottleRatePerMinute,
    DisableEmailClickTracking,
    EmailPreheader,
    IncludeUnsubscribed,
}

/// 追加パラメータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delayed_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time_of_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle_rate_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_email_click_tracking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_preheader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_unsubscribed: Option<bool>,
}

impl NotificationOptions {
    /// キーと値を 1 つ適用する
    ///
    /// 同じキーを再度適用すると後の値で上書きされる。
    ///
    /// # エラー
    ///
    /// - 未知のキー: `ValidationError::UnknownNotificationArg`
    /// - 値の型が合わない: `ValidationError::InvalidNotificationArgValue`
    pub fn apply(&mut self, key: &str, value: &Value) -> Result<(), ValidationError> {
        let arg =
            NotificationArg::from_str(key).map_err(|_| ValidationError::UnknownNotificationArg {
                key: key.to_string(),
            })?;

        match arg {
            NotificationArg::ExternalId => self.external_id = Some(expect_string(arg, value)?),
            NotificationArg::Name => self.name = Some(expect_string(arg, value)?),
            NotificationArg::SendAfter => self.send_after = Some(expect_string(arg, value)?),
            NotificationArg::DelayedOption => {
                self.delayed_option = Some(expect_string(arg, value)?);
            }
            NotificationArg::DeliveryTimeOfDay => {
                self.delivery_time_of_day = Some(expect_string(arg, value)?);
            }
            NotificationArg::ThrottleRatePerMinute => {
                self.throttle_rate_per_minute = Some(expect_u32(arg, value)?);
            }
            NotificationArg::DisableEmailClickTracking => {
                self.disable_email_click_tracking = Some(expect_bool(arg, value)?);
            }
            NotificationArg::EmailPreheader => {
                self.email_preheader = Some(expect_string(arg, value)?);
            }
            NotificationArg::IncludeUnsubscribed => {
                self.include_unsubscribed = Some(expect_bool(arg, value)?);
            }
        }
        Ok(())
    }
}

fn expect_string(arg: NotificationArg, value: &Value) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_value(arg, "string"))
}

fn expect_u32(arg: NotificationArg, value: &Value) -> Result<u32, ValidationError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid_value(arg, "non-negative integer"))
}

fn expect_bool(arg: NotificationArg, value: &Value) -> Result<bool, ValidationError> {
    value
        .as_bool()
        .ok_or_else(|| invalid_value(arg, "boolean"))
}

fn invalid_value(arg: NotificationArg, expected: &'static str) -> ValidationError {
    ValidationError::InvalidNotificationArgValue {
        key: arg.to_string(),
        expected,
    }
}
