use crate::config::ServiceConfig;
use crate::diarize_backend::DiarizeBackend;
use crate::error::TranscribeError;
use crate::types::{DiarizedSegment, SpeakerReference};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::multipart;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// 欠落時のデフォルト話者ラベル
const DEFAULT_SPEAKER: &str = "Speaker A";

/// ダイアライズ文字起こしAPIレスポンス
///
/// サービスは部分的・不規則なペイロードを返すことがあるため、
/// 全フィールドをOptionで受けて受信直後にデフォルト値へ正規化する。
#[derive(Debug, Deserialize)]
struct DiarizedResponse {
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    speaker: Option<String>,
    text: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
}

impl RawSegment {
    /// 欠落フィールドをデフォルト値で補った正規形へ変換
    fn normalize(self) -> DiarizedSegment {
        DiarizedSegment {
            speaker: self.speaker.unwrap_or_else(|| DEFAULT_SPEAKER.to_string()),
            text: self.text.unwrap_or_default(),
            start: self.start.unwrap_or(0.0),
            end: self.end.unwrap_or(0.0),
        }
    }
}

/// 話者リファレンスをAPI向けのdata URIへエンコード
fn reference_data_uri(reference: &SpeakerReference) -> String {
    format!(
        "data:{};base64,{}",
        reference.mime_type,
        BASE64_STANDARD.encode(&reference.audio)
    )
}

/// 1回のリクエスト失敗
enum RequestFailure {
    /// ネットワーク層の失敗（リトライ対象）
    Network(reqwest::Error),
    /// HTTPステータスエラー
    Status { status: StatusCode, body: String },
}

impl RequestFailure {
    /// リトライで回復しうる失敗か
    ///
    /// ネットワークエラー、レート制限 (429)、サーバエラー (5xx) のみ
    /// リトライする。それ以外の4xxは即座に失敗させる。
    fn is_retryable(&self) -> bool {
        match self {
            RequestFailure::Network(_) => true,
            RequestFailure::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
        }
    }

    fn into_error(self) -> TranscribeError {
        match self {
            RequestFailure::Network(e) => {
                TranscribeError::Service(format!("ネットワークエラー: {}", e))
            }
            RequestFailure::Status { status, body } => {
                if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
                    TranscribeError::UnsupportedFormat(format!("サービス応答: {}", body))
                } else {
                    TranscribeError::Service(format!("HTTP {} - {}", status, body))
                }
            }
        }
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestFailure::Network(e) => write!(f, "ネットワークエラー: {}", e),
            RequestFailure::Status { status, .. } => write!(f, "HTTP {}", status),
        }
    }
}

/// リモートのダイアライズ文字起こしサービスクライアント
///
/// 1チャンクにつき1回のネットワーク呼び出しを行う。一時的な失敗は
/// 指数バックオフ付きで `max_retries` 回までリトライする。
pub struct DiarizeClient {
    config: ServiceConfig,
    api_key: String,
    client: reqwest::Client,
}

impl DiarizeClient {
    pub fn new(config: ServiceConfig, api_key: String) -> Result<Self, TranscribeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TranscribeError::Service(format!("HTTPクライアント作成失敗: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// マルチパートフォームを構築
    ///
    /// リファレンスは名前とdata URIの並行配列としてフォームに載せる。
    fn build_form(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        references: &[SpeakerReference],
    ) -> Result<multipart::Form, TranscribeError> {
        let part = multipart::Part::bytes(audio)
            .file_name("chunk.wav")
            .mime_str(mime_type)
            .map_err(|e| {
                TranscribeError::UnsupportedFormat(format!(
                    "MIMEタイプが不正です {}: {}",
                    mime_type, e
                ))
            })?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "diarized_json")
            .text("chunking_strategy", "auto");

        for reference in references {
            form = form
                .text("known_speaker_names[]", reference.label.clone())
                .text("known_speaker_references[]", reference_data_uri(reference));
        }

        Ok(form)
    }

    /// 1回分のAPI呼び出し
    async fn request_once(
        &self,
        form: multipart::Form,
    ) -> Result<Vec<DiarizedSegment>, RequestFailure> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(RequestFailure::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure::Status { status, body });
        }

        // 空応答や不正なJSONはエラーではなく空の結果として扱う
        // （無音チャンクは正当な結果）
        let body = response.text().await.unwrap_or_default();
        let parsed: DiarizedResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("レスポンスの解析に失敗しました。空の結果として扱います: {}", e);
                return Ok(Vec::new());
            }
        };

        Ok(parsed
            .segments
            .into_iter()
            .map(RawSegment::normalize)
            .collect())
    }
}

#[async_trait]
impl DiarizeBackend for DiarizeClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        references: &[SpeakerReference],
    ) -> Result<Vec<DiarizedSegment>, TranscribeError> {
        let mut attempt: u32 = 0;
        loop {
            // multipart::FormはCloneできないため試行毎に構築する
            let form = self.build_form(audio.clone(), mime_type, references)?;

            match self.request_once(form).await {
                Ok(segments) => return Ok(segments),
                Err(failure) => {
                    if !failure.is_retryable() || attempt >= self.config.max_retries {
                        return Err(failure.into_error());
                    }
                    let delay = Duration::from_millis(
                        self.config
                            .retry_base_delay_ms
                            .saturating_mul(2u64.saturating_pow(attempt)),
                    );
                    attempt += 1;
                    log::warn!(
                        "サービス呼び出しに失敗しました。リトライします ({}/{}, {}ms後): {}",
                        attempt,
                        self.config.max_retries,
                        delay.as_millis(),
                        failure
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
