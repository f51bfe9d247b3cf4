use anyhow::{Context, Result};
use dia_transcribe::audio::AudioAsset;
use dia_transcribe::config::Config;
use dia_transcribe::diarize_api::DiarizeClient;
use dia_transcribe::pipeline::Pipeline;
use dia_transcribe::transcript;
use env_logger::Env;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    let mut audio_path: Option<String> = None;
    let mut config_path = "config.toml".to_string();
    let mut output_override: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = args
                    .get(i)
                    .cloned()
                    .context("--config にはパスを指定してください")?;
            }
            "--output" => {
                i += 1;
                output_override = Some(
                    args.get(i)
                        .cloned()
                        .context("--output にはパスを指定してください")?,
                );
            }
            other if !other.starts_with("--") => {
                audio_path = Some(other.to_string());
            }
            other => {
                anyhow::bail!("不明なオプション: {}", other);
            }
        }
        i += 1;
    }

    let audio_path = audio_path.context(
        "使い方: dia-transcribe <音声ファイル.wav> [--config config.toml] [--output transcript.txt]",
    )?;

    // 設定を読み込み
    let config = Config::load_or_default(&config_path)?;
    let transcript_path = output_override.unwrap_or_else(|| config.output.transcript_path.clone());

    log::info!("dia-transcribe を起動します");

    // APIキーはネットワーク呼び出しの前に解決する
    let api_key = config.service.resolve_api_key()?;

    let script_start = Instant::now();

    // 音声を読み込み
    log::info!("音声ファイルを読み込み中: {}", audio_path);
    let asset = AudioAsset::from_wav_file(&audio_path)?;
    log::info!(
        "音声の長さ: {:.2}秒 ({:.2}分)",
        asset.duration_seconds(),
        asset.duration_seconds() / 60.0
    );

    let client = DiarizeClient::new(config.service.clone(), api_key)?;
    let pipeline = Pipeline::new(Arc::new(client), config.chunking.clone());

    // Ctrl+C で新しいチャンク呼び出しの開始を止める
    let cancelled = pipeline.cancel_flag();
    ctrlc::set_handler(move || {
        log::warn!("停止シグナルを受信しました。実行中のチャンクの完了を待ちます...");
        cancelled.store(true, Ordering::SeqCst);
    })?;

    let output = pipeline.run(&asset).await?;

    // コンソールへ出力（ファイルと同じ行・同じ順序）
    transcript::print_transcript(&output.segments, !config.output.preview);

    // ファイルへ保存
    transcript::write_transcript(&transcript_path, &output.segments)?;
    log::info!("文字起こしを保存しました: {}", transcript_path);

    // 実行サマリ
    log::info!(
        "完了: {} チャンク, {} セグメント ({:.2}秒)",
        output.chunk_count,
        output.segments.len(),
        script_start.elapsed().as_secs_f64()
    );
    if !output.failed_chunks.is_empty() {
        log::warn!(
            "失敗したチャンク: {:?}。該当範囲の文字起こしは欠落しています",
            output.failed_chunks
        );
    }

    Ok(())
}
