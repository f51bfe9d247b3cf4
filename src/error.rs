use thiserror::Error;

/// 文字起こしパイプラインのエラー分類
///
/// 致命的なエラー（不正な入力・未対応フォーマット・先頭チャンクの
/// サービス障害）と、チャンク単位で隔離されるエラー（残余チャンクの
/// サービス障害）を区別する。伝播の判断はパイプライン側が行う。
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// 音声または設定の不備
    ///
    /// 実行は中断され、出力は一切書き出されない。
    #[error("入力が不正です: {0}")]
    InvalidInput(String),

    /// リトライ後も回復しなかったリモートサービス障害
    ///
    /// 原因はメッセージに含めて保持する。先頭チャンクでは致命的、
    /// 残余チャンクでは該当チャンクのみ欠落して実行は継続する。
    #[error("文字起こしサービスの呼び出しに失敗しました: {0}")]
    Service(String),

    /// サービスが認識できない音声エンコーディング
    ///
    /// どのチャンクで発生しても致命的（全チャンクが同じ音声に
    /// 由来するため）。
    #[error("未対応の音声フォーマットです: {0}")]
    UnsupportedFormat(String),
}
