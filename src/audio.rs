use crate::error::TranscribeError;
use std::io::Cursor;
use std::path::Path;

/// WAVエクスポートのMIMEタイプ
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// デコード済み音声への不変ハンドル
///
/// モノラルPCM（i16）サンプル列とサンプリングレートを保持する。
/// 時間範囲 `[start, end)` での切り出しと、サービス互換のWAV
/// バイト列へのエクスポートをサポートする。共有可変状態は持たない。
#[derive(Clone, Debug)]
pub struct AudioAsset {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioAsset {
    /// PCMサンプル列からアセットを生成
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// WAVファイルからアセットを読み込み
    ///
    /// 16ビット整数PCMのみ対応。マルチチャンネル音声は全チャンネルの
    /// 平均でモノラルへダウンミックスする。
    ///
    /// # Errors
    ///
    /// ファイルが開けない場合は `InvalidInput`、16ビット整数PCM以外の
    /// エンコーディングの場合は `UnsupportedFormat` を返す。
    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self, TranscribeError> {
        let reader = hound::WavReader::open(path.as_ref()).map_err(|e| {
            TranscribeError::InvalidInput(format!(
                "WAVファイルを開けません {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(TranscribeError::UnsupportedFormat(format!(
                "16ビット整数PCMのみ対応しています (入力: {}ビット {:?})",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let channels = spec.channels as usize;
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()
            .map_err(|e| {
                TranscribeError::InvalidInput(format!("WAVサンプルの読み込みに失敗: {}", e))
            })?;

        // マルチチャンネルはフレーム毎の平均でモノラル化
        let samples = if channels <= 1 {
            raw
        } else {
            raw.chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// 音声の長さ（秒）
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// サンプリングレート (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// サンプル数
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `[start_sec, end_sec)` の範囲を切り出した新しいアセットを返す
    ///
    /// 範囲はアセットの長さにクランプされる。
    pub fn slice(&self, start_sec: f64, end_sec: f64) -> AudioAsset {
        let total = self.samples.len();
        let end = ((end_sec.max(0.0) * self.sample_rate as f64) as usize).min(total);
        let start = ((start_sec.max(0.0) * self.sample_rate as f64) as usize).min(end);

        Self {
            samples: self.samples[start..end].to_vec(),
            sample_rate: self.sample_rate,
        }
    }

    /// WAV形式のバイト列へエクスポート
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, TranscribeError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(|e| {
                TranscribeError::InvalidInput(format!("WAVライターの作成に失敗: {}", e))
            })?;

            for &sample in &self.samples {
                writer.write_sample(sample).map_err(|e| {
                    TranscribeError::InvalidInput(format!("WAVサンプルの書き込みに失敗: {}", e))
                })?;
            }

            writer.finalize().map_err(|e| {
                TranscribeError::InvalidInput(format!("WAVのファイナライズに失敗: {}", e))
            })?;
        }

        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_asset(duration_sec: f64, sample_rate: u32) -> AudioAsset {
        let count = (duration_sec * sample_rate as f64) as usize;
        let samples: Vec<i16> = (0..count)
            .map(|i| ((i as f32 * 0.1).sin() * 10000.0) as i16)
            .collect();
        AudioAsset::from_samples(samples, sample_rate)
    }

    #[test]
    fn test_duration_seconds() {
        let asset = make_asset(2.5, 16000);
        assert!((asset.duration_seconds() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_slice_range() {
        let asset = make_asset(10.0, 16000);
        let clip = asset.slice(2.0, 5.0);

        assert_eq!(clip.len(), 3 * 16000);
        assert!((clip.duration_seconds() - 3.0).abs() < 1e-6);
        assert_eq!(clip.sample_rate(), 16000);
    }

    #[test]
    fn test_slice_clamps_to_asset_length() {
        let asset = make_asset(5.0, 16000);

        let clip = asset.slice(3.0, 100.0);
        assert!((clip.duration_seconds() - 2.0).abs() < 1e-6);

        let clip = asset.slice(-1.0, 1.0);
        assert!((clip.duration_seconds() - 1.0).abs() < 1e-6);

        let clip = asset.slice(10.0, 20.0);
        assert!(clip.is_empty());
    }

    #[test]
    fn test_to_wav_bytes_readable() {
        let asset = make_asset(1.0, 16000);
        let bytes = asset.to_wav_bytes().unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 16000);
    }

    #[test]
    fn test_from_wav_file_round_trip() {
        let asset = make_asset(1.0, 16000);
        let bytes = asset.to_wav_bytes().unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.wav");
        std::fs::write(&path, bytes).unwrap();

        let loaded = AudioAsset::from_wav_file(&path).unwrap();
        assert_eq!(loaded.len(), asset.len());
        assert_eq!(loaded.sample_rate(), 16000);
    }

    #[test]
    fn test_from_wav_file_downmixes_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..16000 {
                writer.write_sample(100i16).unwrap();
                writer.write_sample(300i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let loaded = AudioAsset::from_wav_file(&path).unwrap();
        assert_eq!(loaded.len(), 16000);
        assert!((loaded.duration_seconds() - 1.0).abs() < 1e-6);

        // 平均 (100 + 300) / 2 = 200
        let bytes = loaded.to_wav_bytes().unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let first = reader.into_samples::<i16>().next().unwrap().unwrap();
        assert_eq!(first, 200);
    }

    #[test]
    fn test_from_wav_file_rejects_float_pcm() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("float.wav");
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(0.5f32).unwrap();
            }
            writer.finalize().unwrap();
        }

        let result = AudioAsset::from_wav_file(&path);
        assert!(matches!(
            result,
            Err(TranscribeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_wav_file_missing() {
        let result = AudioAsset::from_wav_file("no_such_file.wav");
        assert!(matches!(result, Err(TranscribeError::InvalidInput(_))));
    }
}
