use crate::types::DiarizedSegment;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// マージ済みセグメント列を表示用の行へ整形する
///
/// 1セグメントにつき1行。入力の順序を保持し、並べ替えは行わない
/// （順序の確定はパイプライン側の責務）。同じ入力に対する出力は
/// 常にバイト単位で同一になる。
pub fn format_lines(segments: &[DiarizedSegment]) -> Vec<String> {
    segments
        .iter()
        .map(|s| format!("[{:.2}s - {:.2}s] {}: {}", s.start, s.end, s.speaker, s.text))
        .collect()
}

/// 文字起こし結果をファイルへ保存する
///
/// UTF-8テキスト、1セグメント1行、各行末尾に改行。既存の内容は
/// 完全に上書きされる。
pub fn write_transcript<P: AsRef<Path>>(path: P, segments: &[DiarizedSegment]) -> Result<()> {
    let content: String = format_lines(segments)
        .iter()
        .map(|line| format!("{}\n", line))
        .collect();

    fs::write(path.as_ref(), content)
        .with_context(|| format!("文字起こしファイルの書き込みに失敗: {:?}", path.as_ref()))?;
    Ok(())
}

/// 文字起こし結果をコンソールへ出力する
///
/// ファイルと同じ行を同じ順序で表示する。`show_all` がfalseで
/// セグメントが20件を超える場合は先頭10件と末尾10件のみ表示する。
pub fn print_transcript(segments: &[DiarizedSegment], show_all: bool) {
    let lines = format_lines(segments);

    if show_all || lines.len() <= 20 {
        for line in &lines {
            println!("{}", line);
        }
    } else {
        for line in &lines[..10] {
            println!("{}", line);
        }
        println!("... [中間 {} セグメントを省略] ...", lines.len() - 20);
        for line in &lines[lines.len() - 10..] {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, text: &str, start: f64, end: f64) -> DiarizedSegment {
        DiarizedSegment {
            speaker: speaker.to_string(),
            text: text.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_line_format() {
        let segments = vec![seg("Speaker A", "there", 1203.0, 1205.0)];
        let lines = format_lines(&segments);
        assert_eq!(lines, vec!["[1203.00s - 1205.00s] Speaker A: there"]);
    }

    #[test]
    fn test_order_preserved() {
        let segments = vec![
            seg("Speaker B", "second", 5.0, 6.0),
            seg("Speaker A", "first", 1.0, 2.0),
        ];
        let lines = format_lines(&segments);

        // 並べ替えは行わない
        assert!(lines[0].contains("second"));
        assert!(lines[1].contains("first"));
    }

    #[test]
    fn test_format_idempotent() {
        let segments = vec![
            seg("Speaker A", "hi", 0.0, 2.0),
            seg("Speaker B", "there", 3.456, 7.891),
        ];
        let first = format_lines(&segments);
        let second = format_lines(&segments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_transcript_trailing_newline() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.txt");

        let segments = vec![
            seg("Speaker A", "hi", 0.0, 2.0),
            seg("Speaker A", "there", 1203.0, 1205.0),
        ];
        write_transcript(&path, &segments).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "[0.00s - 2.00s] Speaker A: hi\n[1203.00s - 1205.00s] Speaker A: there\n"
        );
    }

    #[test]
    fn test_write_transcript_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.txt");

        fs::write(&path, "古い内容がたくさん書かれているファイル\n").unwrap();
        write_transcript(&path, &[seg("Speaker A", "new", 0.0, 1.0)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[0.00s - 1.00s] Speaker A: new\n");
    }

    #[test]
    fn test_write_empty_transcript() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transcript.txt");

        write_transcript(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
