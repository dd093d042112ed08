//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//! 配信メソッドを組み込むアプリケーションが起動時に一度だけ呼び出す。
//!
//! ## 環境変数
//!
//! | 変数名 | デフォルト | 説明 |
//! |--------|------------|------|
//! | `LOG_FORMAT` | `pretty` | `json` または `pretty` |
//! | `RUST_LOG` | `info,pushmail=debug` | ログレベルのフィルタ |

/// ログ形式の環境変数名
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,pushmail=debug";

/// ログ出力形式
///
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 前後の空白は無視する。不正な値の場合は stderr に警告を出して
    /// [`Pretty`](LogFormat::Pretty) を返す（この時点ではまだ subscriber がない）。
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown {LOG_FORMAT_ENV}={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み取る
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        lookup(LOG_FORMAT_ENV)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// アプリケーション名（ルートスパンの `service` フィールドに使う）
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// 環境変数から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// トレーシングを初期化する
///
/// `tracing_error::ErrorLayer` を登録するため、以降に生成された
/// `DeliveryError` は発生地点の `SpanTrace` を保持する。
///
/// グローバル subscriber が既に設定されている場合はエラーを返す。
#[cfg(feature = "observability")]
pub fn init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;

    tracing::debug!(service = %config.service_name, format = ?config.log_format, "トレーシング初期化完了");
    Ok(())
}
