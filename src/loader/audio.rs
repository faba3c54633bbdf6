use std::sync::Arc;

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Ogg,
    Mp3,
    Flac,
}

impl AudioFormat {
    /// Recognises the container from its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(Self::Wav),
            [b'O', b'g', b'g', b'S', ..] => Some(Self::Ogg),
            [b'f', b'L', b'a', b'C', ..] => Some(Self::Flac),
            [b'I', b'D', b'3', ..] => Some(Self::Mp3),
            [0xff, second, ..] if second & 0xe0 == 0xe0 => Some(Self::Mp3),
            _ => None,
        }
    }
}

/// Encoded audio handed to the sink, which owns decoding and playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub path: String,
    pub format: AudioFormat,
    pub bytes: Arc<[u8]>,
}

impl AudioBuffer {
    pub fn decode(path: &str, bytes: Vec<u8>) -> Result<Self, LoadError> {
        let format = AudioFormat::sniff(&bytes)
            .ok_or_else(|| LoadError::decode_failed(path, "unrecognised audio container"))?;
        Ok(Self {
            path: path.to_string(),
            format,
            bytes: Arc::from(bytes.into_boxed_slice()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_containers() {
        assert_eq!(
            AudioFormat::sniff(b"RIFF\x24\x00\x00\x00WAVEfmt "),
            Some(AudioFormat::Wav)
        );
        assert_eq!(AudioFormat::sniff(b"OggS\x00\x02"), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::sniff(b"ID3\x04"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::sniff(&[0xff, 0xfb, 0x90]), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::sniff(b"fLaC"), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::sniff(b"RIFF"), None);
    }

    #[test]
    fn unknown_bytes_fail_to_decode() {
        let err = AudioBuffer::decode("noise.bin", b"hello world".to_vec()).unwrap_err();
        assert_eq!(err.path(), "noise.bin");
    }
}
