use crate::error::TranscribeError;
use crate::types::{DiarizedSegment, SpeakerReference};
use async_trait::async_trait;

/// ダイアライズ文字起こしバックエンドの共通トレイト
///
/// 1チャンク分のエンコード済み音声を渡し、チャンク内ローカル時刻の
/// セグメント列を受け取る。呼び出し間に共有可変状態はない。
#[async_trait]
pub trait DiarizeBackend: Send + Sync {
    /// 1チャンクを文字起こしする
    ///
    /// # Arguments
    ///
    /// * `audio` - エンコード済み音声データ
    /// * `mime_type` - 音声データのMIMEタイプ
    /// * `references` - 話者リファレンス（最大4件。先頭チャンクでは空）
    ///
    /// # Returns
    ///
    /// チャンク内ローカル時刻のセグメント列。無音や空応答は
    /// エラーではなく空の列として返す。
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        references: &[SpeakerReference],
    ) -> Result<Vec<DiarizedSegment>, TranscribeError>;
}
