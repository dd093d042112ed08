//! # ドメイン層エラー定義
//!
//! メールの解析と通知リクエストへのマッピングで発生するエラー。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//! - **部分結果なし**: マッピングは完全に成功するか、何も返さずに失敗する
//!
//! ## エラーの種類
//!
//! | エラー種別 | 発生箇所 | 用途 |
//! |-----------|---------|------|
//! | `MissingTemplateForSentinelSubject` | マッパー | テンプレート件名指定なのに template_id がない |
//! | `UnsupportedCustomArgsType` | マッパー | custom_notification_args の形が不正 |
//! | `UnknownNotificationArg` | マッパー | 受け付けない通知パラメータ名 |
//! | `InvalidNotificationArgValue` | マッパー | 通知パラメータの値の型が不正 |
//! | `AddressError::Invalid` | メール構築 | メールアドレスとして解析できない |

use thiserror::Error;

/// マッピング時の検証エラー
///
/// 通知 API への送信前に同期的に検出される。
/// 呼び出し元に部分的な通知リクエストが返ることはない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 件名がテンプレート件名の指定なのに、template_id がない
    ///
    /// テンプレート件名はテンプレート側が件名を供給する前提のため、
    /// テンプレートを指定しない限り件名が決まらない。
    #[error("テンプレート件名を使う場合は template_id の指定が必須です")]
    MissingTemplateForSentinelSubject,

    /// custom_notification_args が対応していない形をしている
    ///
    /// 対応するのはキー・値のマップ、またはマップの列のみ。
    #[error("custom_notification_args の型に対応していません: {type_name}")]
    UnsupportedCustomArgsType {
        /// 実際に渡されたフィールドの型名
        type_name: &'static str,
    },

    /// custom_notification_args に未知のキーが含まれている
    #[error("未知の通知パラメータです: {key}")]
    UnknownNotificationArg {
        /// 受け付けられなかったキー
        key: String,
    },

    /// 既知の通知パラメータに対して値の型が合わない
    #[error("通知パラメータ {key} の値が不正です（期待する型: {expected}）")]
    InvalidNotificationArgValue {
        /// 通知パラメータ名
        key:      String,
        /// 期待する値の型
        expected: &'static str,
    },
}

/// メールアドレスの解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// メールアドレスとして解析できない
    #[error("メールアドレスが不正です: {input}（{reason}）")]
    Invalid {
        /// 解析しようとした入力
        input:  String,
        /// 解析失敗の理由
        reason: String,
    },
}
