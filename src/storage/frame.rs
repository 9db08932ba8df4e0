//! Checksummed frame codec
//!
//! 所有持久化文件（catalog / table heap / index）都使用同一种帧格式，
//! 防止数据损坏和静默错误。
//!
//! ## 帧格式
//! ```text
//! [format: u8][payload_len: u32 LE][payload][crc32: u32 LE]
//! ```
//! - format `0`: payload 是原始 bincode
//! - format `1`: payload 是 Snappy 压缩后的 bincode
//!
//! 写入先落到 `<file>.tmp`，（可选）fsync 后再 rename，
//! 读到的永远是完整的旧版本或新版本。失败时删除 `<file>.tmp`。

use crate::config::DBConfig;
use crate::Result;
use crc32fast::Hasher;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const FORMAT_RAW: u8 = 0;
const FORMAT_SNAPPY: u8 = 1;
const HEADER_LEN: usize = 1 + 4;
const TRAILER_LEN: usize = 4;

/// Frame encode/decode options, derived from `DBConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Verify the CRC32 trailer on read
    pub verify_checksum: bool,
    /// Snappy-compress payloads on write
    pub compress: bool,
    /// fsync before the rename
    pub sync: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self::from(&DBConfig::default())
    }
}

impl From<&DBConfig> for FrameOptions {
    fn from(config: &DBConfig) -> Self {
        Self {
            verify_checksum: config.checksum,
            compress: config.compression,
            sync: config.durability.requires_immediate_sync(),
        }
    }
}

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(
        "Checksum mismatch: expected {expected:#010x}, got {actual:#010x} (data_len={data_len})"
    )]
    Mismatch {
        expected: u32,
        actual: u32,
        data_len: usize,
    },

    #[error("Invalid frame format: {0}")]
    InvalidFormat(String),

    #[error("Snappy error: {0}")]
    Compression(#[from] snap::Error),

    #[error("Payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),
}

/// Length field of a frame; payloads past `u32::MAX` bytes are rejected
fn payload_len_field(len: usize) -> std::result::Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge(len))
}

/// CRC32 of a byte slice
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Wrap `data` into a frame
pub fn encode_frame(
    data: &[u8],
    options: &FrameOptions,
) -> std::result::Result<Vec<u8>, FrameError> {
    let (format, payload) = if options.compress {
        (FORMAT_SNAPPY, snap::raw::Encoder::new().compress_vec(data)?)
    } else {
        (FORMAT_RAW, data.to_vec())
    };

    let len = payload_len_field(payload.len())?;

    let mut encoded = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    encoded.push(format);
    encoded.extend_from_slice(&len.to_le_bytes());
    encoded.extend_from_slice(&payload);
    encoded.extend_from_slice(&checksum(&payload).to_le_bytes());
    Ok(encoded)
}

/// Unwrap a frame, returning the uncompressed bytes
pub fn decode_frame(
    encoded: &[u8],
    options: &FrameOptions,
) -> std::result::Result<Vec<u8>, FrameError> {
    if encoded.len() < HEADER_LEN + TRAILER_LEN {
        return Err(FrameError::InvalidFormat("Data too short".to_string()));
    }

    let format = encoded[0];
    let payload_len = u32::from_le_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]) as usize;
    if encoded.len() != HEADER_LEN + payload_len + TRAILER_LEN {
        return Err(FrameError::InvalidFormat(format!(
            "Expected {} bytes, got {}",
            HEADER_LEN + payload_len + TRAILER_LEN,
            encoded.len()
        )));
    }

    let payload = &encoded[HEADER_LEN..HEADER_LEN + payload_len];
    if options.verify_checksum {
        let t = HEADER_LEN + payload_len;
        let trailer = [encoded[t], encoded[t + 1], encoded[t + 2], encoded[t + 3]];
        let expected = u32::from_le_bytes(trailer);
        let actual = checksum(payload);
        if actual != expected {
            return Err(FrameError::Mismatch {
                expected,
                actual,
                data_len: payload_len,
            });
        }
    }

    match format {
        FORMAT_RAW => Ok(payload.to_vec()),
        FORMAT_SNAPPY => Ok(snap::raw::Decoder::new().decompress_vec(payload)?),
        other => Err(FrameError::InvalidFormat(format!("Unknown frame format {}", other))),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Serialize `value` with bincode and atomically replace `path` with its frame
pub fn write_frame<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    options: &FrameOptions,
) -> Result<()> {
    let data = bincode::serialize(value)?;
    let encoded = encode_frame(&data, options)?;

    let tmp = tmp_path(path);
    let written = replace_with(&tmp, path, &encoded, options.sync);
    if written.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            log::warn!("could not remove {:?}: {}", tmp, e);
        }
    }
    written?;
    Ok(())
}

fn replace_with(tmp: &Path, path: &Path, encoded: &[u8], sync: bool) -> std::io::Result<()> {
    {
        let mut file = File::create(tmp)?;
        file.write_all(encoded)?;
        if sync {
            file.sync_all()?;
        }
    }
    fs::rename(tmp, path)
}

/// Read and decode a frame written by `write_frame`
pub fn read_frame<T: DeserializeOwned>(path: &Path, options: &FrameOptions) -> Result<T> {
    let encoded = fs::read(path)?;
    let data = decode_frame(&encoded, options)?;
    Ok(bincode::deserialize(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    fn opts(compress: bool) -> FrameOptions {
        FrameOptions {
            verify_checksum: true,
            compress,
            sync: false,
        }
    }

    #[test]
    fn test_checksum_deterministic() {
        let data = b"Deterministic test";
        assert_eq!(checksum(data), checksum(data));
        assert_ne!(checksum(data), checksum(b"Deterministic tesT"));
        // CRC32 对空数据返回 0
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn test_frame_encode_decode() {
        let data = b"minidb frame payload minidb frame payload minidb frame payload";
        for compress in [false, true] {
            let encoded = encode_frame(data, &opts(compress)).unwrap();
            assert_eq!(encoded[0], if compress { FORMAT_SNAPPY } else { FORMAT_RAW });
            // decoding does not depend on the writer's compression setting
            let decoded = decode_frame(&encoded, &opts(!compress)).unwrap();
            assert_eq!(decoded, data);
        }
    }

    #[test]
    fn test_frame_decode_corrupted() {
        let mut encoded = encode_frame(b"Hello, minidb!", &opts(false)).unwrap();
        encoded[8] ^= 0xFF;

        let result = decode_frame(&encoded, &opts(false));
        assert!(matches!(result, Err(FrameError::Mismatch { .. })));

        // Verification switched off: corrupted bytes come through untouched
        let relaxed = FrameOptions {
            verify_checksum: false,
            ..opts(false)
        };
        assert!(decode_frame(&encoded, &relaxed).is_ok());
    }

    #[test]
    fn test_frame_decode_invalid_format() {
        assert!(matches!(
            decode_frame(b"abc", &opts(false)),
            Err(FrameError::InvalidFormat(_))
        ));

        let mut invalid = vec![0u8; 20];
        invalid[1] = 100;
        assert!(matches!(
            decode_frame(&invalid, &opts(false)),
            Err(FrameError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_write_read_frame_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");

        let value: Vec<(u64, String)> = vec![(1, "a".into()), (2, "b".into())];
        write_frame(&path, &value, &opts(true)).unwrap();
        assert!(!tmp_path(&path).exists());

        let back: Vec<(u64, String)> = read_frame(&path, &opts(false)).unwrap();
        assert_eq!(back, value);

        // Flip a payload byte on disk
        let mut raw = fs::read(&path).unwrap();
        raw[HEADER_LEN] ^= 0x55;
        fs::write(&path, raw).unwrap();
        let err = read_frame::<Vec<(u64, String)>>(&path, &opts(false)).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_failed_write_removes_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the rename fail
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        let err = write_frame(&path, &vec![1u64, 2, 3], &opts(false)).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(!tmp_path(&path).exists());
        assert!(path.join("inner").exists());
    }

    #[test]
    fn test_payload_length_limit() {
        assert_eq!(payload_len_field(42).unwrap(), 42);
        assert_eq!(payload_len_field(u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        {
            let err: StorageError = payload_len_field(u32::MAX as usize + 1).unwrap_err().into();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        }
    }
}
