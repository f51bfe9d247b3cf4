use serde::{Deserialize, Serialize};

/// 話者ラベル付きの文字起こしセグメント
///
/// リモートサービスが返す1発話区間を正規化した形。`start` / `end` は
/// 生成元チャンク内のローカル時刻（秒）で、マージ時に `with_offset`
/// でグローバルタイムラインへ変換される。ローカル・グローバルの
/// どちらの段階でもこの1つの型で表現する。
///
/// # Examples
///
/// ```
/// # use dia_transcribe::types::DiarizedSegment;
/// let segment = DiarizedSegment {
///     speaker: "Speaker A".to_string(),
///     text: "こんにちは".to_string(),
///     start: 5.0,
///     end: 10.0,
/// };
/// let merged = segment.with_offset(1200.0);
/// assert_eq!(merged.start, 1205.0);
/// assert_eq!(merged.end, 1210.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiarizedSegment {
    /// 話者ラベル（例: "Speaker A"）
    pub speaker: String,

    /// 発話テキスト
    pub text: String,

    /// 開始時刻（秒）
    pub start: f64,

    /// 終了時刻（秒）
    pub end: f64,
}

impl DiarizedSegment {
    /// セグメントの長さ（秒）
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// チャンクの開始オフセットを加算したセグメントを返す
    ///
    /// 話者ラベルとテキストは変更しない。
    pub fn with_offset(&self, offset: f64) -> Self {
        Self {
            speaker: self.speaker.clone(),
            text: self.text.clone(),
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// 話者リファレンス
///
/// 先頭チャンクの結果から切り出した短い音声クリップ。後続チャンクの
/// 文字起こしリクエストに添付し、チャンク間で話者ラベルの一貫性を
/// 保つために使う。1回の実行で最大4件作成され、以後は読み取り専用。
#[derive(Clone)]
pub struct SpeakerReference {
    /// 話者ラベル
    pub label: String,

    /// エンコード済み音声データ
    pub audio: Vec<u8>,

    /// 音声データのMIMEタイプ（例: "audio/wav"）
    pub mime_type: String,
}

impl std::fmt::Debug for SpeakerReference {
    // 音声バイト列はダンプしない
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerReference")
            .field("label", &self.label)
            .field("audio_bytes", &self.audio.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}
