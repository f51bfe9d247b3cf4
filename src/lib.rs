//! dia-transcribe - 話者ダイアライズ付き長時間音声文字起こし
//!
//! リモートのダイアライズ文字起こしサービスを使って、任意の長さの
//! 音声を話者ラベル・タイムスタンプ付きのテキストへ変換するクレート。
//! 中核はチャンク分割とチャンク横断の話者一貫性パイプライン:
//! 長い音声をサービスの上限時間以下のチャンクへ分割し、各チャンクを
//! 独立に文字起こしし、話者ラベルの一貫性を保ったまま1本の
//! タイムラインへ再結合する。
//!
//! # 主な機能
//!
//! - **チャンク分割**: サービスの1リクエスト上限に収まる連続スライスを生成
//! - **話者リファレンス**: 先頭チャンクの結果から最大4名分の音声クリップを抽出
//! - **一貫性のあるマージ**: 後続チャンクへ同一リファレンスを適用し、
//!   時間オフセットを加算して結合
//! - **部分失敗の隔離**: 残余チャンクの失敗は該当チャンクの欠落に留まる
//!
//! # アーキテクチャ
//!
//! ```text
//! [AudioAsset] → [Segmenter] → [Pipeline]
//!                                   ↓
//!                         ┌─────────┴─────────┐
//!                         │                   │
//!                  [DiarizeClient] ← [SpeakerRefs]
//!                         │
//!                         ↓
//!                   [Transcript]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use dia_transcribe::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```
//!
//! 話者ラベルの一貫性はリファレンスに紐づく最大4名（アンカー済み
//! ラベル）についてのみ保証される。先頭チャンクに現れない話者や
//! 5人目以降の話者のラベルはチャンク間で一致しないことがある。

pub mod audio;
pub mod config;
pub mod diarize_api;
pub mod diarize_backend;
pub mod error;
pub mod pipeline;
pub mod segmenter;
pub mod speaker_refs;
pub mod transcript;
pub mod types;
