use crate::audio::AudioAsset;
use crate::error::TranscribeError;

/// 元音声のタイムライン上の1チャンク
///
/// セグメンタが生成し、パイプラインが1度だけ消費する。
#[derive(Clone, Debug)]
pub struct Chunk {
    /// チャンク番号（0始まり、昇順）
    pub index: usize,

    /// 元音声タイムライン上の開始オフセット（秒）
    pub start_offset: f64,

    /// このチャンクの音声
    pub asset: AudioAsset,
}

/// 音声アセットを上限時間以下のチャンク列へ分割する
///
/// アセット全体が `max_chunk_seconds` 以下なら、オフセット0の
/// 単一チャンクを返す。それ以外は `[0, duration)` を
/// `max_chunk_seconds` 刻みの連続区間で隙間なく覆い、末尾の
/// チャンクのみ短くなる。
///
/// # Errors
///
/// 以下の場合は `InvalidInput` を返す:
/// - アセットの長さが0秒以下
/// - `max_chunk_seconds` が0以下
/// - `max_chunk_seconds` がサービスの1リクエスト上限
///   `service_limit_seconds` 以上（上限未満であることが必須）
pub fn segment(
    asset: &AudioAsset,
    max_chunk_seconds: f64,
    service_limit_seconds: f64,
) -> Result<Vec<Chunk>, TranscribeError> {
    let duration = asset.duration_seconds();

    if duration <= 0.0 {
        return Err(TranscribeError::InvalidInput(
            "音声の長さが0秒以下です".to_string(),
        ));
    }
    if max_chunk_seconds <= 0.0 {
        return Err(TranscribeError::InvalidInput(format!(
            "チャンク長が不正です: {}秒",
            max_chunk_seconds
        )));
    }
    if max_chunk_seconds >= service_limit_seconds {
        return Err(TranscribeError::InvalidInput(format!(
            "チャンク長 {}秒 はサービス上限 {}秒 未満である必要があります",
            max_chunk_seconds, service_limit_seconds
        )));
    }

    if duration <= max_chunk_seconds {
        return Ok(vec![Chunk {
            index: 0,
            start_offset: 0.0,
            asset: asset.clone(),
        }]);
    }

    let mut chunks = Vec::new();
    let mut start = 0.0;
    let mut index = 0;
    while start < duration {
        let end = (start + max_chunk_seconds).min(duration);
        chunks.push(Chunk {
            index,
            start_offset: start,
            asset: asset.slice(start, end),
        });
        index += 1;
        start += max_chunk_seconds;
    }

    Ok(chunks)
}
