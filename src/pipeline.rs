use crate::audio::{AudioAsset, WAV_MIME_TYPE};
use crate::config::ChunkingConfig;
use crate::diarize_backend::DiarizeBackend;
use crate::error::TranscribeError;
use crate::segmenter::segment;
use crate::speaker_refs::build_references;
use crate::types::DiarizedSegment;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// パイプライン実行結果
#[derive(Debug)]
pub struct PipelineOutput {
    /// グローバルタイムラインへマージ済みのセグメント列
    ///
    /// チャンク番号順、チャンク内はサービスの返却順を保持する。
    pub segments: Vec<DiarizedSegment>,

    /// 分割されたチャンク数
    pub chunk_count: usize,

    /// 失敗したチャンク番号（昇順）
    pub failed_chunks: Vec<usize>,
}

/// 話者一貫性を保つ分割文字起こしのコーディネータ
///
/// 先頭チャンクをリファレンスなしで文字起こしし、その結果から話者
/// リファレンスを作成する。残りのチャンクは同一のリファレンス集合を
/// 添付して並行に文字起こしし、各チャンクの開始オフセットを加算して
/// 1本のタイムラインへマージする。
///
/// 先頭チャンクの失敗は致命的（リファレンスと後続全チャンクが依存
/// する）。残余チャンクの失敗は該当チャンクの欠落として記録され、
/// 実行は継続する。
pub struct Pipeline {
    backend: Arc<dyn DiarizeBackend>,
    config: ChunkingConfig,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn DiarizeBackend>, config: ChunkingConfig) -> Self {
        Self {
            backend,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// キャンセルフラグを共有する
    ///
    /// フラグが立つと新しいチャンク呼び出しを開始しない。実行中の
    /// 呼び出しは完了まで継続し、完了したチャンクだけがマージされる。
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// アセット全体を文字起こしする
    pub async fn run(&self, asset: &AudioAsset) -> Result<PipelineOutput, TranscribeError> {
        let chunks = segment(
            asset,
            self.config.max_chunk_seconds,
            self.config.service_limit_seconds,
        )?;
        let chunk_count = chunks.len();
        log::info!(
            "音声を {} チャンクに分割しました（最大 {:.0}秒/チャンク）",
            chunk_count,
            self.config.max_chunk_seconds
        );

        let mut chunks = chunks.into_iter();
        let first = match chunks.next() {
            Some(chunk) => chunk,
            None => {
                return Err(TranscribeError::InvalidInput(
                    "音声の長さが0秒以下です".to_string(),
                ))
            }
        };

        // 先頭チャンク: リファレンスなしで文字起こしする。
        // 失敗した場合はリファレンスを作れず後続チャンクも
        // 意味を持たないため、実行全体を中断する。
        let started = Instant::now();
        log::info!("チャンク 0 を文字起こし中（リファレンスなし）");
        let audio = first.asset.to_wav_bytes()?;
        let first_segments = self
            .backend
            .transcribe(audio, WAV_MIME_TYPE, &[])
            .await
            .map_err(|e| match e {
                TranscribeError::Service(cause) => TranscribeError::Service(format!(
                    "先頭チャンクで失敗したため実行を中断します: {}",
                    cause
                )),
                other => other,
            })?;
        log::info!(
            "チャンク 0 完了: {} セグメント ({:.2}秒)",
            first_segments.len(),
            started.elapsed().as_secs_f64()
        );

        // 単一チャンクでもリファレンス作成は実行する（適用先が
        // ないだけで、失敗しないことが要件）
        let references = build_references(&first_segments, &first.asset, &self.config);
        log::info!("話者リファレンスを {} 件作成しました", references.len());

        if chunk_count == 1 {
            return Ok(PipelineOutput {
                segments: first_segments,
                chunk_count,
                failed_chunks: Vec::new(),
            });
        }

        // 残余チャンク: 固定のリファレンス集合を添付して並行実行。
        // 結果はチャンク番号のスロットへ格納し、完了順に依存しない。
        let references = Arc::new(references);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::new();

        for chunk in chunks {
            let backend = Arc::clone(&self.backend);
            let references = Arc::clone(&references);
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&self.cancelled);

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // セマフォは実行中に閉じない
                        return (
                            chunk.start_offset,
                            Err(TranscribeError::Service(
                                "内部エラー: セマフォが閉じられました".to_string(),
                            )),
                        );
                    }
                };

                if cancelled.load(Ordering::SeqCst) {
                    return (
                        chunk.start_offset,
                        Err(TranscribeError::Service(
                            "キャンセルにより未実行です".to_string(),
                        )),
                    );
                }

                let audio = match chunk.asset.to_wav_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => return (chunk.start_offset, Err(e)),
                };

                log::info!("チャンク {} を文字起こし中", chunk.index);
                let started = Instant::now();
                let result = backend.transcribe(audio, WAV_MIME_TYPE, &references).await;
                if result.is_ok() {
                    log::info!(
                        "チャンク {} 完了 ({:.2}秒)",
                        chunk.index,
                        started.elapsed().as_secs_f64()
                    );
                }
                (chunk.start_offset, result)
            }));
        }

        // チャンク番号順に組み立てる（完了順ではない）
        let mut slots: Vec<Option<Vec<DiarizedSegment>>> = vec![None; chunk_count];
        let mut failed_chunks = Vec::new();

        for (pos, handle) in handles.into_iter().enumerate() {
            let index = pos + 1;
            match handle.await {
                Ok((start_offset, Ok(segments))) => {
                    slots[index] = Some(
                        segments
                            .iter()
                            .map(|s| s.with_offset(start_offset))
                            .collect(),
                    );
                }
                // フォーマット非対応は全チャンクに共通するため即座に中断
                Ok((_, Err(e @ TranscribeError::UnsupportedFormat(_)))) => return Err(e),
                Ok((_, Err(e))) => {
                    log::warn!(
                        "チャンク {} の文字起こしに失敗しました。このチャンクはスキップされます: {}",
                        index,
                        e
                    );
                    failed_chunks.push(index);
                }
                Err(e) => {
                    log::warn!("チャンク {} のタスク実行に失敗しました: {}", index, e);
                    failed_chunks.push(index);
                }
            }
        }

        // チャンク0はオフセット0なのでそのまま先頭に置く
        let mut merged = first_segments;
        for slot in slots.into_iter().skip(1).flatten() {
            merged.extend(slot);
        }

        Ok(PipelineOutput {
            segments: merged,
            chunk_count,
            failed_chunks,
        })
    }
}
