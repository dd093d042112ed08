//! # フィールドマッパー
//!
//! [`MailMessage`] を [`NotificationRequest`] に変換する。
//!
//! ## 変換規則
//!
//! 1. **検証**: 件名がテンプレート件名で `template_id` がなければ失敗する
//! 2. **アプリケーション ID**: 上書き値があればそれを、なければデフォルトを使う
//! 3. **送信元**: 先頭のアドレスのみ使う。名前は表示名 → コメント名の順
//! 4. **宛先**: 上書きフィールドが 1 つでもあれば上書きモード、なければメールモード
//! 5. **件名**: テンプレート件名なら設定しない
//! 6. **本文**: `template_id` があればテンプレートモード（本文は設定しない）。
//!    なければ MIME タイプで判定し、マルチパートは HTML パートを優先する
//! 7. **追加パラメータ**: `custom_notification_args` のマップを順に適用する
//!
//! 副作用はなく、呼び出しごとに新しいリクエストを生成する。

use crate::{
    error::ValidationError,
    mail::{CustomField, MailMessage, Subject, field},
    notification::{Audience, EMAIL_CHANNEL, NotificationRequest, TargetedAudience},
};

/// フィールドマッパー
///
/// デフォルトのアプリケーション ID は構築時のスナップショットとして保持する。
#[derive(Debug, Clone)]
pub struct FieldMapper {
    default_app_id:  String,
    app_id_override: Option<String>,
}

impl FieldMapper {
    pub fn new(default_app_id: impl Into<String>) -> Self {
        Self {
            default_app_id:  default_app_id.into(),
            app_id_override: None,
        }
    }

    /// デフォルトより優先するアプリケーション ID を設定する
    pub fn with_app_id_override(mut self, app_id: Option<String>) -> Self {
        self.app_id_override = app_id;
        self
    }

    /// メールを通知リクエストに変換する
    ///
    /// # エラー
    ///
    /// - テンプレート件名なのに `template_id` がない:
    ///   `ValidationError::MissingTemplateForSentinelSubject`
    /// - `custom_notification_args` がマップでもマップの列でもない:
    ///   `ValidationError::UnsupportedCustomArgsType`
    /// - `custom_notification_args` のキーや値が不正:
    ///   `ValidationError::UnknownNotificationArg` /
    ///   `ValidationError::InvalidNotificationArgValue`
    pub fn map(&self, message: &MailMessage) -> Result<NotificationRequest, ValidationError> {
        validate(message)?;

        let app_id = self
            .app_id_override
            .as_deref()
            .unwrap_or(&self.default_app_id);
        let mut request = NotificationRequest::new(app_id, resolve_audience(message));

        apply_sender(&mut request, message);
        apply_subject(&mut request, message);
        apply_body(&mut request, message);
        apply_custom_notification_args(&mut request, message)?;

        Ok(request)
    }
}

/// デフォルトのアプリケーション ID でメールを変換する
pub fn map(
    message: &MailMessage,
    default_app_id: &str,
) -> Result<NotificationRequest, ValidationError> {
    FieldMapper::new(default_app_id).map(message)
}

fn validate(message: &MailMessage) -> Result<(), ValidationError> {
    let uses_template_subject = message.subject().is_some_and(Subject::is_use_template);
    if uses_template_subject && !message.has_field(field::TEMPLATE_ID) {
        return Err(ValidationError::MissingTemplateForSentinelSubject);
    }
    Ok(())
}

fn apply_sender(request: &mut NotificationRequest, message: &MailMessage) {
    // 2 件目以降の送信元は使わない
    let Some(sender) = message.from_addresses().first() else {
        return;
    };
    request.email_from_address = Some(sender.address().to_string());
    request.email_from_name = sender.sender_name().map(str::to_string);
}

fn resolve_audience(message: &MailMessage) -> Audience {
    let overridden = field::AUDIENCE_OVERRIDES
        .iter()
        .any(|name| message.has_field(name));

    if !overridden {
        return Audience::EmailTokens {
            include_email_tokens: message
                .to_addresses()
                .iter()
                .map(|address| address.address().to_string())
                .collect(),
        };
    }

    let split = |name: &str| message.field(name).map(CustomField::split_values);
    let include_external_user_ids = split(field::INCLUDE_EXTERNAL_USER_IDS);
    let channel_for_external_user_ids = include_external_user_ids
        .as_ref()
        .map(|_| EMAIL_CHANNEL.to_string());

    Audience::Targeted(TargetedAudience {
        include_external_user_ids,
        channel_for_external_user_ids,
        include_player_ids: split(field::INCLUDE_PLAYER_IDS),
        included_segments: split(field::INCLUDED_SEGMENTS),
        excluded_segments: split(field::EXCLUDED_SEGMENTS),
    })
}

fn apply_subject(request: &mut NotificationRequest, message: &MailMessage) {
    request.email_subject = message
        .subject()
        .and_then(Subject::as_text)
        .map(str::to_string);
}

fn apply_body(request: &mut NotificationRequest, message: &MailMessage) {
    if let Some(template_id) = message.field(field::TEMPLATE_ID) {
        request.template_id = Some(template_id.to_text());
        request.custom_data = message.field(field::CUSTOM_DATA).map(CustomField::to_json);
        return;
    }

    let Some(body) = message.body() else {
        return;
    };
    match body.mime_type() {
        "text/plain" | "text/html" => {
            request.email_body = body.decoded().map(str::to_string);
        }
        "multipart/alternative" | "multipart/mixed" | "multipart/related" => {
            if let Some(text) = body.text_part() {
                request.email_body = Some(text.to_string());
            }
            // HTML パートがあれば常にこちらが勝つ
            if let Some(html) = body.html_part() {
                request.email_body = Some(html.to_string());
            }
        }
        _ => {}
    }
}

fn apply_custom_notification_args(
    request: &mut NotificationRequest,
    message: &MailMessage,
) -> Result<(), ValidationError> {
    let Some(input) = message.field(field::CUSTOM_NOTIFICATION_ARGS) else {
        return Ok(());
    };

    let maps = match input {
        CustomField::Map(map) => std::slice::from_ref(map),
        CustomField::MapList(maps) => maps.as_slice(),
        CustomField::List(items) if items.is_empty() => &[][..],
        other => {
            return Err(ValidationError::UnsupportedCustomArgsType {
                type_name: other.type_name(),
            });
        }
    };

    for map in maps {
        for (key, value) in map {
            request.options.apply(key, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::{
        mail::{MailBody, MailMessageBuilder, USE_TEMPLATE_SUBJECT},
        notification::NotificationOptions,
    };

    const APP_ID: &str = "00000000-0000-0000-0000-000000000000";
    const ALT_APP_ID: &str = "11111111-1111-1111-1111-111111111111";
    const EMAIL_TEXT_BODY: &str = "I am a plain text body";
    const EMAIL_HTML_BODY: &str = "I am an <b>HTML</b> body";

    // フィクスチャ

    #[fixture]
    fn mail() -> MailMessageBuilder {
        MailMessage::builder()
            .to("test@example.com")
            .from("test@company.co")
            .subject("Hello Test!")
    }

    fn map_ok(builder: MailMessageBuilder) -> NotificationRequest {
        map(&builder.build().unwrap(), APP_ID).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    // アプリケーション ID

    #[rstest]
    fn test_デフォルトのアプリケーションidを使う(mail: MailMessageBuilder) {
        let request = map_ok(mail);

        assert_eq!(request.app_id, APP_ID);
        assert!(!request.is_ios);
    }

    #[rstest]
    fn test_上書きのアプリケーションidを優先する(mail: MailMessageBuilder) {
        let sut = FieldMapper::new(APP_ID).with_app_id_override(Some(ALT_APP_ID.to_string()));

        let request = sut.map(&mail.build().unwrap()).unwrap();

        assert_eq!(request.app_id, ALT_APP_ID);
    }

    // 宛先

    #[rstest]
    fn test_単一の宛先をメールトークンにする(mail: MailMessageBuilder) {
        let request = map_ok(mail);

        assert_eq!(
            request.include_email_tokens(),
            Some(&strings(&["test@example.com"])[..])
        );
        assert_eq!(request.include_external_user_ids(), None);
        assert_eq!(request.channel_for_external_user_ids(), None);
        assert_eq!(request.include_player_ids(), None);
        assert_eq!(request.included_segments(), None);
        assert_eq!(request.excluded_segments(), None);
    }

    #[rstest]
    #[case("Test Person <test@example.com>", &["test@example.com"])]
    #[case("\"Test Person\" <test@example.com>", &["test@example.com"])]
    #[case("test1@example.com;test2@example.com", &["test1@example.com", "test2@example.com"])]
    #[case(
        "Test1 Person <test1@example.com>; Test2 Person <test2@example.com>",
        &["test1@example.com", "test2@example.com"]
    )]
    #[case(
        "\"Test1 Person\" <test1@example.com>; \"Test2 Person\" <test2@example.com>",
        &["test1@example.com", "test2@example.com"]
    )]
    fn test_宛先のアドレス部分だけを順序どおりに使う(
        #[case] to: &str,
        #[case] expected: &[&str],
    ) {
        let request = map_ok(MailMessage::builder().to(to).subject("Hello"));

        assert_eq!(request.include_email_tokens(), Some(&strings(expected)[..]));
    }

    #[rstest]
    fn test_外部ユーザーidで宛先を上書きする(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(field::INCLUDE_EXTERNAL_USER_IDS, vec!["1", "2", "3"]));

        assert_eq!(
            request.include_external_user_ids(),
            Some(&strings(&["1", "2", "3"])[..])
        );
        assert_eq!(request.channel_for_external_user_ids(), Some("email"));
        assert_eq!(request.include_email_tokens(), None);
    }

    #[rstest]
    #[case(field::INCLUDE_PLAYER_IDS)]
    #[case(field::INCLUDED_SEGMENTS)]
    #[case(field::EXCLUDED_SEGMENTS)]
    fn test_上書きフィールドはカンマで分割してトリムする(
        mail: MailMessageBuilder,
        #[case] name: &str,
    ) {
        let request = map_ok(mail.field(name, "1, 2 ,3"));

        let expected = strings(&["1", "2", "3"]);
        let actual = match name {
            field::INCLUDE_PLAYER_IDS => request.include_player_ids(),
            field::INCLUDED_SEGMENTS => request.included_segments(),
            _ => request.excluded_segments(),
        };
        assert_eq!(actual, Some(&expected[..]));
        assert_eq!(request.include_email_tokens(), None);
        assert_eq!(request.channel_for_external_user_ids(), None);
    }

    #[rstest]
    fn test_プレイヤーidの上書き(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(field::INCLUDE_PLAYER_IDS, "1,2,3"));

        assert_eq!(
            request.include_player_ids(),
            Some(&strings(&["1", "2", "3"])[..])
        );
        assert_eq!(request.include_email_tokens(), None);
    }

    #[rstest]
    fn test_複数の上書きフィールドを同時に設定できる(mail: MailMessageBuilder) {
        let request = map_ok(
            mail.field(field::INCLUDED_SEGMENTS, "Active Users")
                .field(field::EXCLUDED_SEGMENTS, "Dormant"),
        );

        assert_eq!(
            request.included_segments(),
            Some(&strings(&["Active Users"])[..])
        );
        assert_eq!(request.excluded_segments(), Some(&strings(&["Dormant"])[..]));
        assert_eq!(request.include_player_ids(), None);
    }

    // 送信元

    #[test]
    fn test_送信元がなければ設定しない() {
        let request = map_ok(MailMessage::builder().to("test@example.com").subject("x"));

        assert_eq!(request.email_from_address, None);
        assert_eq!(request.email_from_name, None);
    }

    #[rstest]
    fn test_名前なしの送信元(mail: MailMessageBuilder) {
        let request = map_ok(mail);

        assert_eq!(request.email_from_address.as_deref(), Some("test@company.co"));
        assert_eq!(request.email_from_name, None);
    }

    #[rstest]
    #[case("Test Person <test@company.co>")]
    #[case("\"Test Person\" <test@company.co>")]
    #[case("test@company.co (Test Person)")]
    fn test_名前つきの送信元(#[case] from: &str) {
        let request = map_ok(MailMessage::builder().from(from).subject("x"));

        assert_eq!(request.email_from_address.as_deref(), Some("test@company.co"));
        assert_eq!(request.email_from_name.as_deref(), Some("Test Person"));
    }

    #[test]
    fn test_先頭以外の送信元は無視する() {
        let request = map_ok(
            MailMessage::builder()
                .from("test1@company.co;Second <test2@company.co>")
                .subject("x"),
        );

        assert_eq!(request.email_from_address.as_deref(), Some("test1@company.co"));
        assert_eq!(request.email_from_name, None);
    }

    // 件名

    #[rstest]
    fn test_件名をそのまま使う(mail: MailMessageBuilder) {
        let request = map_ok(mail);
        assert_eq!(request.email_subject.as_deref(), Some("Hello Test!"));
    }

    #[rstest]
    fn test_テンプレートなしでテンプレート件名は失敗する(mail: MailMessageBuilder) {
        let message = mail.subject(USE_TEMPLATE_SUBJECT).build().unwrap();

        assert_eq!(
            map(&message, APP_ID),
            Err(ValidationError::MissingTemplateForSentinelSubject)
        );
    }

    // 本文

    #[rstest]
    #[case(MailBody::text(EMAIL_TEXT_BODY), Some(EMAIL_TEXT_BODY))]
    #[case(MailBody::html(EMAIL_HTML_BODY), Some(EMAIL_HTML_BODY))]
    #[case(MailBody::single("application/pdf", "%PDF"), None)]
    fn test_単一パートの本文(
        mail: MailMessageBuilder,
        #[case] body: MailBody,
        #[case] expected: Option<&str>,
    ) {
        let request = map_ok(mail.body(body));
        assert_eq!(request.email_body.as_deref(), expected);
    }

    #[rstest]
    #[case("multipart/alternative")]
    #[case("multipart/mixed")]
    #[case("multipart/related")]
    fn test_マルチパートではhtmlパートが勝つ(mail: MailMessageBuilder, #[case] mime_type: &str) {
        let body = MailBody::multipart(
            mime_type,
            Some(EMAIL_TEXT_BODY.to_string()),
            Some(EMAIL_HTML_BODY.to_string()),
        );

        let request = map_ok(mail.body(body));

        assert_eq!(request.email_body.as_deref(), Some(EMAIL_HTML_BODY));
    }

    #[rstest]
    fn test_テキストとhtmlの短い本文でもhtmlが勝つ(mail: MailMessageBuilder) {
        let request = map_ok(mail.body(MailBody::alternative("A", "<b>B</b>")));
        assert_eq!(request.email_body.as_deref(), Some("<b>B</b>"));
    }

    #[rstest]
    fn test_htmlパートがなければテキストパートを使う(mail: MailMessageBuilder) {
        let body = MailBody::multipart("multipart/mixed", Some(EMAIL_TEXT_BODY.to_string()), None);

        let request = map_ok(mail.body(body));

        assert_eq!(request.email_body.as_deref(), Some(EMAIL_TEXT_BODY));
    }

    // テンプレート

    #[rstest]
    fn test_template_idを設定する(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(field::TEMPLATE_ID, "1"));

        assert_eq!(request.template_id.as_deref(), Some("1"));
        assert_eq!(request.email_subject.as_deref(), Some("Hello Test!"));
    }

    #[rstest]
    fn test_テンプレートでは件名の番兵を無視する(mail: MailMessageBuilder) {
        let request = map_ok(
            mail.field(field::TEMPLATE_ID, "1")
                .subject(USE_TEMPLATE_SUBJECT),
        );

        assert_eq!(request.template_id.as_deref(), Some("1"));
        assert_eq!(request.email_subject, None);
    }

    #[rstest]
    #[case(MailBody::text(EMAIL_TEXT_BODY))]
    #[case(MailBody::alternative(EMAIL_TEXT_BODY, EMAIL_HTML_BODY))]
    fn test_テンプレートでは本文を設定しない(mail: MailMessageBuilder, #[case] body: MailBody) {
        let request = map_ok(mail.field(field::TEMPLATE_ID, "1").body(body));
        assert_eq!(request.email_body, None);
    }

    #[rstest]
    fn test_テンプレートにカスタムデータを渡す(mail: MailMessageBuilder) {
        let request = map_ok(
            mail.field(field::TEMPLATE_ID, "1")
                .field(field::CUSTOM_DATA, json!({"plan": "pro", "seats": 3})),
        );

        assert_eq!(request.custom_data, Some(json!({"plan": "pro", "seats": 3})));
    }

    #[rstest]
    fn test_テンプレートなしではカスタムデータを渡さない(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(field::CUSTOM_DATA, json!({"plan": "pro"})));
        assert_eq!(request.custom_data, None);
    }

    // 追加パラメータ

    #[rstest]
    fn test_external_idを設定する(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(
            field::CUSTOM_NOTIFICATION_ARGS,
            json!({"external_id": "Test"}),
        ));

        assert_eq!(request.options.external_id.as_deref(), Some("Test"));
    }

    #[rstest]
    fn test_配信時刻の指定を設定する(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(
            field::CUSTOM_NOTIFICATION_ARGS,
            json!({"delayed_option": "timezone", "delivery_time_of_day": "9:00AM"}),
        ));

        assert_eq!(request.options.delayed_option.as_deref(), Some("timezone"));
        assert_eq!(request.options.delivery_time_of_day.as_deref(), Some("9:00AM"));
    }

    #[rstest]
    fn test_送信レート制限を設定する(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(
            field::CUSTOM_NOTIFICATION_ARGS,
            json!({"throttle_rate_per_minute": 4}),
        ));

        assert_eq!(request.options.throttle_rate_per_minute, Some(4));
    }

    #[rstest]
    fn test_マップの列は順に適用され後勝ちになる(mail: MailMessageBuilder) {
        let request = map_ok(mail.field(
            field::CUSTOM_NOTIFICATION_ARGS,
            json!([
                {"external_id": "first", "name": "Campaign"},
                {"external_id": "second"},
            ]),
        ));

        assert_eq!(request.options.external_id.as_deref(), Some("second"));
        assert_eq!(request.options.name.as_deref(), Some("Campaign"));
    }

    #[rstest]
    #[case(CustomField::from("external_id=Test"), "text")]
    #[case(CustomField::from(vec!["external_id"]), "list")]
    #[case(CustomField::from(json!(5)), "number")]
    #[case(CustomField::from(json!(true)), "bool")]
    fn test_対応しない型の追加パラメータは失敗する(
        mail: MailMessageBuilder,
        #[case] value: CustomField,
        #[case] type_name: &'static str,
    ) {
        let message = mail
            .field(field::CUSTOM_NOTIFICATION_ARGS, value)
            .build()
            .unwrap();

        assert_eq!(
            map(&message, APP_ID),
            Err(ValidationError::UnsupportedCustomArgsType { type_name })
        );
    }

    #[rstest]
    #[case(CustomField::from(json!([])))]
    #[case(CustomField::from(Vec::<&str>::new()))]
    #[case(CustomField::from(json!(null)))]
    fn test_空の追加パラメータは何も設定しない(
        mail: MailMessageBuilder,
        #[case] value: CustomField,
    ) {
        let request = map_ok(mail.field(field::CUSTOM_NOTIFICATION_ARGS, value));

        assert_eq!(request.options, NotificationOptions::default());
    }

    #[rstest]
    #[case("1, ,2", &["1", "", "2"])]
    #[case("1,2,", &["1", "2"])]
    #[case(",1", &["", "1"])]
    fn test_上書きフィールドの空要素は末尾以外を残す(
        mail: MailMessageBuilder,
        #[case] raw: &str,
        #[case] expected: &[&str],
    ) {
        let request = map_ok(mail.field(field::INCLUDE_PLAYER_IDS, raw));

        assert_eq!(request.include_player_ids(), Some(&strings(expected)[..]));
    }

    #[rstest]
    fn test_未知の追加パラメータは失敗する(mail: MailMessageBuilder) {
        let message = mail
            .field(field::CUSTOM_NOTIFICATION_ARGS, json!({"template_id": "2"}))
            .build()
            .unwrap();

        assert_eq!(
            map(&message, APP_ID),
            Err(ValidationError::UnknownNotificationArg {
                key: "template_id".to_string(),
            })
        );
    }
}
