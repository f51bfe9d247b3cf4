use crate::error::TranscribeError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// リモートのダイアライズ文字起こしサービス設定
///
/// # デフォルト値
///
/// - `endpoint`: OpenAIの音声文字起こしエンドポイント
/// - `model`: "gpt-4o-transcribe-diarize"
/// - `timeout_seconds`: 300 秒（チャンク1件のアップロードを含む）
/// - `max_retries`: 3 回
/// - `retry_base_delay_ms`: 1000 ms（指数バックオフの初期値）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// APIキー。省略時は環境変数 OPENAI_API_KEY を参照する
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// チャンク分割と話者リファレンス抽出の設定
///
/// # デフォルト値
///
/// - `max_chunk_seconds`: 1200 秒（20分。サービス上限1400秒に対する余裕）
/// - `service_limit_seconds`: 1400 秒（サービスの1リクエスト上限）
/// - `concurrency`: 2（残余チャンクの同時リクエスト数）
/// - `max_reference_speakers`: 4（サービスが受け付けるリファレンス上限）
/// - `reference_min_seconds` / `reference_max_seconds`: 2〜10 秒
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_seconds")]
    pub max_chunk_seconds: f64,

    #[serde(default = "default_service_limit_seconds")]
    pub service_limit_seconds: f64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_reference_speakers")]
    pub max_reference_speakers: usize,

    #[serde(default = "default_reference_min_seconds")]
    pub reference_min_seconds: f64,

    #[serde(default = "default_reference_max_seconds")]
    pub reference_max_seconds: f64,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `transcript_path`: "transcript.txt"
/// - `preview`: false（コンソールに全セグメントを表示する。
///   true にすると先頭10件と末尾10件のみ表示）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_transcript_path")]
    pub transcript_path: String,

    #[serde(default = "default_preview")]
    pub preview: bool,
}

// Default functions
fn default_endpoint() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_model() -> String {
    "gpt-4o-transcribe-diarize".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_chunk_seconds() -> f64 {
    1200.0 // サービス上限1400秒に対して余裕を持たせる
}

fn default_service_limit_seconds() -> f64 {
    1400.0
}

fn default_concurrency() -> usize {
    2
}

fn default_max_reference_speakers() -> usize {
    4
}

fn default_reference_min_seconds() -> f64 {
    2.0
}

fn default_reference_max_seconds() -> f64 {
    10.0
}

fn default_transcript_path() -> String {
    "transcript.txt".to_string()
}

fn default_preview() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            chunking: ChunkingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_seconds: default_max_chunk_seconds(),
            service_limit_seconds: default_service_limit_seconds(),
            concurrency: default_concurrency(),
            max_reference_speakers: default_max_reference_speakers(),
            reference_min_seconds: default_reference_min_seconds(),
            reference_max_seconds: default_reference_max_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            transcript_path: default_transcript_path(),
            preview: default_preview(),
        }
    }
}

impl ServiceConfig {
    /// APIキーを解決する
    ///
    /// 設定ファイルの値を優先し、なければ環境変数 OPENAI_API_KEY を
    /// 参照する。どちらにもなければエラー。ネットワーク呼び出しの
    /// 前に必ず呼ぶこと。
    pub fn resolve_api_key(&self) -> Result<String, TranscribeError> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(TranscribeError::InvalidInput(
                "APIキーが見つかりません。設定ファイルの [service] api_key \
                 または環境変数 OPENAI_API_KEY を設定してください"
                    .to_string(),
            )),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use dia_transcribe::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use dia_transcribe::config::Config;
    /// Config::write_default("config.toml").unwrap();
    /// ```
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// ファイルが存在するがパースに失敗した場合のみエラーを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}
