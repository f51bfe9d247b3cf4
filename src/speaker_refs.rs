use crate::audio::{AudioAsset, WAV_MIME_TYPE};
use crate::config::ChunkingConfig;
use crate::types::{DiarizedSegment, SpeakerReference};
use std::collections::HashMap;

/// 先頭チャンクの結果から話者リファレンスを作成する
///
/// 1. 話者毎の合計発話時間を集計する
/// 2. 合計時間の降順（同値は初出順）で上位 `max_reference_speakers`
///    名を選ぶ
/// 3. 各話者について、長さが `reference_min_seconds` 〜
///    `reference_max_seconds` に収まる最初のセグメントをクリップとして
///    切り出す。該当セグメントがない話者はスキップする
///
/// 0件から上限までの部分的な結果は正当であり、この関数は失敗しない。
pub fn build_references(
    segments: &[DiarizedSegment],
    chunk_asset: &AudioAsset,
    config: &ChunkingConfig,
) -> Vec<SpeakerReference> {
    // 初出順を保ったまま話者毎の合計発話時間を集計
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for segment in segments {
        match positions.get(&segment.speaker) {
            Some(&i) => totals[i].1 += segment.duration(),
            None => {
                positions.insert(segment.speaker.clone(), totals.len());
                totals.push((segment.speaker.clone(), segment.duration()));
            }
        }
    }

    // 合計時間の降順。安定ソートなので同値は初出順のまま
    let mut ranked: Vec<usize> = (0..totals.len()).collect();
    ranked.sort_by(|&a, &b| {
        totals[b]
            .1
            .partial_cmp(&totals[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(config.max_reference_speakers);

    let mut references = Vec::new();
    for i in ranked {
        let (speaker, total_time) = &totals[i];

        // クリップ長条件を満たす最初のセグメントを採用
        let candidate = segments.iter().find(|s| {
            s.speaker == *speaker
                && s.duration() >= config.reference_min_seconds
                && s.duration() <= config.reference_max_seconds
        });

        let segment = match candidate {
            Some(segment) => segment,
            None => {
                log::warn!(
                    "話者 {} に {}〜{}秒のセグメントがないためリファレンスを作成しません",
                    speaker,
                    config.reference_min_seconds,
                    config.reference_max_seconds
                );
                continue;
            }
        };

        let clip = chunk_asset.slice(segment.start, segment.end);
        let audio = match clip.to_wav_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("話者 {} のリファレンスクリップ生成に失敗: {}", speaker, e);
                continue;
            }
        };

        log::info!(
            "話者 {}: 合計発話 {:.2}秒, リファレンス [{:.2}s - {:.2}s]",
            speaker,
            total_time,
            segment.start,
            segment.end
        );

        references.push(SpeakerReference {
            label: speaker.clone(),
            audio,
            mime_type: WAV_MIME_TYPE.to_string(),
        });
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 100;

    fn make_asset(duration_sec: f64) -> AudioAsset {
        let count = (duration_sec * SAMPLE_RATE as f64) as usize;
        AudioAsset::from_samples(vec![0i16; count], SAMPLE_RATE)
    }

    fn seg(speaker: &str, start: f64, end: f64) -> DiarizedSegment {
        DiarizedSegment {
            speaker: speaker.to_string(),
            text: String::new(),
            start,
            end,
        }
    }

    #[test]
    fn test_single_speaker_single_reference() {
        let asset = make_asset(60.0);
        let segments = vec![seg("Speaker A", 0.0, 3.0), seg("Speaker A", 10.0, 14.0)];

        let references = build_references(&segments, &asset, &ChunkingConfig::default());

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].label, "Speaker A");
        assert_eq!(references[0].mime_type, "audio/wav");
    }

    #[test]
    fn test_at_most_max_speakers() {
        let asset = make_asset(120.0);
        // 5人の話者。発話時間順: E(7) > D(6) > C(5) > B(4) > A(3)
        let mut segments = Vec::new();
        for (i, name) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            let len = 3.0 + i as f64;
            segments.push(seg(name, 20.0 * i as f64, 20.0 * i as f64 + len));
        }

        let references = build_references(&segments, &asset, &ChunkingConfig::default());

        assert_eq!(references.len(), 4);
        let labels: Vec<&str> = references.iter().map(|r| r.label.as_str()).collect();
        // 上位4名のみ。最短のAは落ちる
        assert!(!labels.contains(&"A"));
        assert!(labels.contains(&"E"));
    }

    #[test]
    fn test_tie_broken_by_first_appearance() {
        let asset = make_asset(60.0);
        // BとCは同じ合計時間。初出が早いBが先に並ぶ
        let segments = vec![
            seg("B", 0.0, 5.0),
            seg("C", 10.0, 15.0),
            seg("A", 20.0, 29.0),
        ];

        let config = ChunkingConfig {
            max_reference_speakers: 2,
            ..ChunkingConfig::default()
        };
        let references = build_references(&segments, &asset, &config);

        assert_eq!(references.len(), 2);
        assert_eq!(references[0].label, "A");
        assert_eq!(references[1].label, "B");
    }

    #[test]
    fn test_first_qualifying_segment_chosen() {
        let asset = make_asset(60.0);
        // 1秒（短すぎ）→ 3秒（採用）→ 8秒 の順
        let segments = vec![
            seg("Speaker A", 0.0, 1.0),
            seg("Speaker A", 10.0, 13.0),
            seg("Speaker A", 20.0, 28.0),
        ];

        let references = build_references(&segments, &asset, &ChunkingConfig::default());

        assert_eq!(references.len(), 1);
        // 3秒クリップ = 300サンプル @ 100Hz
        let reader =
            hound::WavReader::new(std::io::Cursor::new(references[0].audio.clone())).unwrap();
        assert_eq!(reader.duration(), 300);
    }

    #[test]
    fn test_speaker_without_qualifying_segment_skipped() {
        let asset = make_asset(60.0);
        // Bのセグメントは全て範囲外（1秒と15秒）
        let segments = vec![
            seg("A", 0.0, 5.0),
            seg("B", 10.0, 11.0),
            seg("B", 20.0, 35.0),
        ];

        let references = build_references(&segments, &asset, &ChunkingConfig::default());

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].label, "A");
    }

    #[test]
    fn test_boundary_durations_inclusive() {
        let asset = make_asset(60.0);
        let segments = vec![seg("A", 0.0, 2.0), seg("B", 10.0, 20.0)];

        let references = build_references(&segments, &asset, &ChunkingConfig::default());

        // 2秒ちょうどと10秒ちょうどはどちらも有効
        assert_eq!(references.len(), 2);
    }

    #[test]
    fn test_empty_segments_empty_references() {
        let asset = make_asset(60.0);
        let references = build_references(&[], &asset, &ChunkingConfig::default());
        assert!(references.is_empty());
    }
}
