//! # 受信メール
//!
//! メーラーが生成したメールを、マッパーが読み取れる形で表現する。
//!
//! ## 設計方針
//!
//! - **アドレス解析は lettre に委譲**: `Name <addr>` 形式の解析に
//!   `lettre::message::Mailbox` を使う
//! - **カスタムフィールドはタグ付き enum**: ヘッダ風の任意フィールドは
//!   [`CustomField`] として構築時に型を確定させ、使用箇所で型を推測しない
//! - **テンプレート件名は enum で表現**: 件名の番兵値は [`Subject::UseTemplate`]
//!
//! ## 含まれる型
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`MailAddress`] | アドレスと表示名 |
//! | [`Subject`] | 件名、またはテンプレート件名の指定 |
//! | [`MailBody`] | 単一パート / マルチパート本文 |
//! | [`CustomField`] | 文字列 / 文字列リスト / マップ / マップの列 |
//! | [`MailMessage`] | 上記をまとめたメール本体 |

use std::{collections::HashMap, str::FromStr};

use derive_more::From;
use lettre::message::Mailbox;
use serde_json::{Map, Number, Value};
use strum::IntoStaticStr;

use crate::error::AddressError;

/// テンプレート件名を表す番兵文字列
///
/// 件名にこの文字列を渡すと [`Subject::UseTemplate`] になり、
/// 件名はテンプレート側から供給される。
pub const USE_TEMPLATE_SUBJECT: &str = "__PUSHMAIL_USE_TEMPLATE_SUBJECT__";

/// マッパーが参照するカスタムフィールド名
pub mod field {
    /// 通知テンプレート ID
    pub const TEMPLATE_ID: &str = "template_id";
    /// テンプレートへ渡すカスタムデータ
    pub const CUSTOM_DATA: &str = "custom_data";
    /// 外部ユーザー ID による宛先指定
    pub const INCLUDE_EXTERNAL_USER_IDS: &str = "include_external_user_ids";
    /// プレイヤー ID による宛先指定
    pub const INCLUDE_PLAYER_IDS: &str = "include_player_ids";
    /// 配信対象セグメント
    pub const INCLUDED_SEGMENTS: &str = "included_segments";
    /// 配信除外セグメント
    pub const EXCLUDED_SEGMENTS: &str = "excluded_segments";
    /// 通知リクエストへそのまま渡す追加パラメータ
    pub const CUSTOM_NOTIFICATION_ARGS: &str = "custom_notification_args";

    /// 宛先を上書きするフィールド（いずれかがあれば上書きモード）
    pub const AUDIENCE_OVERRIDES: [&str; 4] = [
        INCLUDE_EXTERNAL_USER_IDS,
        INCLUDE_PLAYER_IDS,
        INCLUDED_SEGMENTS,
        EXCLUDED_SEGMENTS,
    ];
}

// =========================================================================
// MailAddress
// =========================================================================

/// メールアドレス（表示名つき）
///
/// `addr@host (Name)` 形式のコメントは `comment_name` として保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    address:      String,
    display_name: Option<String>,
    comment_name: Option<String>,
}

impl MailAddress {
    /// 単一のアドレスを解析する
    ///
    /// 受け付ける形式:
    ///
    /// - `user@example.com`
    /// - `Test Person <user@example.com>`
    /// - `"Test Person" <user@example.com>`
    /// - `user@example.com (Test Person)`
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let (mailbox_part, comment_name) = split_trailing_comment(trimmed);

        let mailbox = Mailbox::from_str(mailbox_part).map_err(|e| AddressError::Invalid {
            input:  trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            address: mailbox.email.to_string(),
            display_name: mailbox.name.as_deref().and_then(non_empty_unquoted),
            comment_name,
        })
    }

    /// `,` または `;` 区切りのアドレス列を解析する
    ///
    /// 引用符・山括弧・コメントの内側の区切り文字は無視する。
    /// 空要素は読み飛ばし、順序と重複は保持する。
    pub fn parse_list(input: &str) -> Result<Vec<Self>, AddressError> {
        split_address_list(input)
            .into_iter()
            .map(Self::parse)
            .collect()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn comment_name(&self) -> Option<&str> {
        self.comment_name.as_deref()
    }

    /// 送信者名として使う名前
    ///
    /// 表示名を優先し、なければコメント形式の名前を使う。
    pub fn sender_name(&self) -> Option<&str> {
        self.display_name().or_else(|| self.comment_name())
    }
}

/// `addr (Name)` の末尾コメントを切り出す
fn split_trailing_comment(input: &str) -> (&str, Option<String>) {
    if !input.ends_with(')') {
        return (input, None);
    }
    let Some(open) = input.rfind('(') else {
        return (input, None);
    };
    let head = input[..open].trim_end();
    if head.is_empty() {
        return (input, None);
    }
    let comment = input[open + 1..input.len() - 1].trim();
    let comment = (!comment.is_empty()).then(|| comment.to_string());
    (head, comment)
}

fn non_empty_unquoted(name: &str) -> Option<String> {
    let name = name.trim();
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
        .trim();
    (!name.is_empty()).then(|| name.replace("\\\"", "\""))
}

fn split_address_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut angle_depth = 0u32;
    let mut comment_depth = 0u32;

    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            '(' if !in_quotes => comment_depth += 1,
            ')' if !in_quotes => comment_depth = comment_depth.saturating_sub(1),
            ',' | ';' if !in_quotes && angle_depth == 0 && comment_depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

// =========================================================================
// Subject
// =========================================================================

/// 件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// そのまま通知に使う件名
    Text(String),
    /// テンプレートが件名を供給する（template_id が必須）
    UseTemplate,
}

impl Subject {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::UseTemplate => None,
        }
    }

    pub fn is_use_template(&self) -> bool {
        matches!(self, Self::UseTemplate)
    }
}

impl From<&str> for Subject {
    fn from(value: &str) -> Self {
        if value == USE_TEMPLATE_SUBJECT {
            Self::UseTemplate
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<String> for Subject {
    fn from(value: String) -> Self {
        if value == USE_TEMPLATE_SUBJECT {
            Self::UseTemplate
        } else {
            Self::Text(value)
        }
    }
}

// =========================================================================
// MailBody
// =========================================================================

/// メール本文
///
/// 本文はデコード済みの文字列として保持する。
/// MIME タイプは小文字化し、`; charset=...` などのパラメータを除いて保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    /// 単一パート本文
    SinglePart { mime_type: String, content: String },
    /// マルチパート本文（テキストパートと HTML パートはそれぞれ任意）
    MultiPart {
        mime_type: String,
        text_part: Option<String>,
        html_part: Option<String>,
    },
}

impl MailBody {
    pub fn single(mime_type: &str, content: impl Into<String>) -> Self {
        Self::SinglePart {
            mime_type: normalize_mime_type(mime_type),
            content:   content.into(),
        }
    }

    /// `text/plain` の単一パート本文
    pub fn text(content: impl Into<String>) -> Self {
        Self::single("text/plain", content)
    }

    /// `text/html` の単一パート本文
    pub fn html(content: impl Into<String>) -> Self {
        Self::single("text/html", content)
    }

    pub fn multipart(
        mime_type: &str,
        text_part: Option<String>,
        html_part: Option<String>,
    ) -> Self {
        Self::MultiPart {
            mime_type: normalize_mime_type(mime_type),
            text_part,
            html_part,
        }
    }

    /// `multipart/alternative` の本文
    pub fn alternative(text_part: impl Into<String>, html_part: impl Into<String>) -> Self {
        Self::multipart(
            "multipart/alternative",
            Some(text_part.into()),
            Some(html_part.into()),
        )
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::SinglePart { mime_type, .. } | Self::MultiPart { mime_type, .. } => mime_type,
        }
    }

    /// 単一パートのデコード済み本文
    pub fn decoded(&self) -> Option<&str> {
        match self {
            Self::SinglePart { content, .. } => Some(content),
            Self::MultiPart { .. } => None,
        }
    }

    pub fn text_part(&self) -> Option<&str> {
        match self {
            Self::MultiPart { text_part, .. } => text_part.as_deref(),
            Self::SinglePart { .. } => None,
        }
    }

    pub fn html_part(&self) -> Option<&str> {
        match self {
            Self::MultiPart { html_part, .. } => html_part.as_deref(),
            Self::SinglePart { .. } => None,
        }
    }
}

fn normalize_mime_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// =========================================================================
// CustomField
// =========================================================================

/// ヘッダ風のカスタムフィールド
///
/// メール構築時に型を確定させる。型名は [`CustomField::type_name`] で取得でき、
/// エラー診断に使う。
#[derive(Debug, Clone, PartialEq, From, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CustomField {
    /// 値なし（ビルダーはフィールドを設定しない）
    #[from(skip)]
    Null,
    Bool(bool),
    Number(Number),
    /// 生の文字列（カンマ区切りのリストを含む）
    Text(String),
    /// 文字列のリスト
    List(Vec<String>),
    /// キー・値のマップ
    Map(Map<String, Value>),
    /// キー・値のマップの列
    MapList(Vec<Map<String, Value>>),
}

impl CustomField {
    pub fn type_name(&self) -> &'static str {
        self.into()
    }

    /// カンマで分割し、前後の空白を除いた値の列
    ///
    /// リストは各要素をさらに分割する。マップは値を文字列化して分割する。
    /// 区切りの間が空でも要素として残す（`"1, ,2"` は `["1", "", "2"]`）。
    /// 末尾の空区切りは落とす。
    pub fn split_values(&self) -> Vec<String> {
        match self {
            Self::Null | Self::MapList(_) => Vec::new(),
            Self::Bool(_) | Self::Number(_) => split_comma_separated(&self.to_text()),
            Self::Text(raw) => split_comma_separated(raw),
            Self::List(items) => items
                .iter()
                .flat_map(|item| split_comma_separated(item))
                .collect(),
            Self::Map(map) => map
                .values()
                .flat_map(|value| split_comma_separated(&render_scalar(value)))
                .collect(),
        }
    }

    /// 単一の文字列値として読む
    ///
    /// リストは `", "` で連結し、マップは JSON 文字列にする。
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Text(raw) => raw.clone(),
            Self::List(items) => items.join(", "),
            Self::Map(_) | Self::MapList(_) => self.to_json().to_string(),
        }
    }

    /// JSON 値として読む
    ///
    /// 文字列は JSON のオブジェクトか配列として解釈できる場合のみ解釈し、
    /// それ以外は JSON 文字列のまま扱う。
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(value) => Value::Number(value.clone()),
            Self::Text(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
                _ => Value::String(raw.clone()),
            },
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Map(map) => Value::Object(map.clone()),
            Self::MapList(maps) => Value::Array(maps.iter().cloned().map(Value::Object).collect()),
        }
    }
}

impl From<&str> for CustomField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<&str>> for CustomField {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Value> for CustomField {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(value) => Self::Number(value),
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Map(map),
            // 空配列は要素のないマップの列として扱う
            Value::Array(items) if items.iter().all(Value::is_object) => Self::MapList(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Array(items) => Self::List(items.iter().map(render_scalar).collect()),
        }
    }
}

/// 末尾の空区切りだけを落とす（`"1,2,"` は `["1", "2"]`、`""` は空）
fn split_comma_separated(raw: &str) -> Vec<String> {
    let mut segments: Vec<&str> = raw.split(',').collect();
    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }
    segments
        .into_iter()
        .map(|segment| segment.trim().to_string())
        .collect()
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// =========================================================================
// MailMessage
// =========================================================================

/// メール本体
///
/// [`MailMessage::builder`] で構築する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailMessage {
    from:    Vec<MailAddress>,
    to:      Vec<MailAddress>,
    subject: Option<Subject>,
    body:    Option<MailBody>,
    fields:  HashMap<String, CustomField>,
}

impl MailMessage {
    pub fn builder() -> MailMessageBuilder {
        MailMessageBuilder::default()
    }

    pub fn from_addresses(&self) -> &[MailAddress] {
        &self.from
    }

    pub fn to_addresses(&self) -> &[MailAddress] {
        &self.to
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn body(&self) -> Option<&MailBody> {
        self.body.as_ref()
    }

    /// 名前でカスタムフィールドを引く
    pub fn field(&self, name: &str) -> Option<&CustomField> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// [`MailMessage`] のビルダー
///
/// アドレスは `build()` の時点でまとめて解析する。
#[derive(Debug, Default)]
pub struct MailMessageBuilder {
    from:    Vec<String>,
    to:      Vec<String>,
    subject: Option<Subject>,
    body:    Option<MailBody>,
    fields:  HashMap<String, CustomField>,
}

impl MailMessageBuilder {
    /// 送信元を追加する（`,` / `;` 区切りで複数指定可）
    pub fn from(mut self, addresses: impl Into<String>) -> Self {
        self.from.push(addresses.into());
        self
    }

    /// 宛先を追加する（`,` / `;` 区切りで複数指定可）
    pub fn to(mut self, addresses: impl Into<String>) -> Self {
        self.to.push(addresses.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<Subject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn body(mut self, body: MailBody) -> Self {
        self.body = Some(body);
        self
    }

    /// カスタムフィールドを設定する（同名は上書き）
    ///
    /// [`CustomField::Null`] は未設定として扱い、同名の既存値も取り除く。
    pub fn field(mut self, name: impl Into<String>, value: impl Into<CustomField>) -> Self {
        let name = name.into();
        match value.into() {
            CustomField::Null => {
                self.fields.remove(&name);
            }
            value => {
                self.fields.insert(name, value);
            }
        }
        self
    }

    pub fn build(self) -> Result<MailMessage, AddressError> {
        Ok(MailMessage {
            from:    parse_all(&self.from)?,
            to:      parse_all(&self.to)?,
            subject: self.subject,
            body:    self.body,
            fields:  self.fields,
        })
    }
}

fn parse_all(lists: &[String]) -> Result<Vec<MailAddress>, AddressError> {
    let mut addresses = Vec::new();
    for list in lists {
        addresses.extend(MailAddress::parse_list(list)?);
    }
    Ok(addresses)
}
