//! Decoder for farbfeld images: an 8-byte magic, big-endian `u32` width and
//! height, then 16-bit big-endian RGBA per pixel. Alpha is dropped and each
//! channel is reduced to 8 bits.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

pub const MAGIC: &[u8; 8] = b"farbfeld";
const HEADER_LEN: usize = 16;
const BYTES_PER_PIXEL: usize = 8;
/// Images above this many pixels are refused before anything is allocated.
pub const MAX_PIXELS: u64 = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad magic, not a farbfeld image")]
    BadMagic,
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("image too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Row-major packed RGB, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

pub fn load(path: &Path) -> Result<PixelBuffer, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    decode(BufReader::new(file))
}

pub fn decode<R: Read>(mut reader: R) -> Result<PixelBuffer, DecodeError> {
    let mut header = [0u8; HEADER_LEN];
    read_exact(&mut reader, &mut header, "header")?;
    if &header[..8] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let width = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    let height = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PIXELS {
        return Err(DecodeError::TooLarge { width, height });
    }

    let mut raw = vec![0u8; pixels as usize * BYTES_PER_PIXEL];
    read_exact(&mut reader, &mut raw, "pixel data")?;

    // The high byte of a big-endian u16 is the value divided by 256.
    let rgb = raw
        .chunks_exact(BYTES_PER_PIXEL)
        .flat_map(|px| [px[0], px[2], px[4]])
        .collect();

    Ok(PixelBuffer { width, height, rgb })
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), DecodeError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::Truncated(what),
        _ => DecodeError::Io(err),
    })
}

#[cfg(test)]
pub(crate) fn encode(width: u32, height: u32, rgba16: &[[u16; 4]]) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    for px in rgba16 {
        for channel in px {
            out.extend_from_slice(&channel.to_be_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn decodes_and_downsamples() {
        let bytes = encode(
            2,
            1,
            &[[0xffff, 0x8000, 0x00ff, 0x1234], [0x0100, 0x01ff, 0xfe00, 0]],
        );
        let image = decode(bytes.as_slice()).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 1);
        assert_eq!(image.rgb, vec![0xff, 0x80, 0x00, 0x01, 0x01, 0xfe]);
    }

    #[test]
    fn empty_image_is_valid() {
        let image = decode(encode(0, 5, &[]).as_slice()).unwrap();
        assert_eq!(image.width, 0);
        assert!(image.rgb.is_empty());
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = encode(1, 1, &[[0, 0, 0, 0]]);
        bytes[0] = b'F';
        assert!(matches!(decode(bytes.as_slice()), Err(DecodeError::BadMagic)));
    }

    #[test]
    fn rejects_short_header() {
        assert!(matches!(
            decode(&b"farbfeld\0\0"[..]),
            Err(DecodeError::Truncated("header"))
        ));
    }

    #[test]
    fn rejects_short_pixel_data() {
        let mut bytes = encode(2, 2, &[[1, 2, 3, 4]; 4]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            decode(bytes.as_slice()),
            Err(DecodeError::Truncated("pixel data"))
        ));
    }

    #[test]
    fn rejects_huge_dimensions() {
        let bytes = encode(u32::MAX, u32::MAX, &[]);
        assert!(matches!(
            decode(bytes.as_slice()),
            Err(DecodeError::TooLarge { .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode(1, 1, &[[0x1000, 0x2000, 0x3000, 0xffff]]))
            .unwrap();
        let image = load(file.path()).unwrap();
        assert_eq!(image.rgb, vec![0x10, 0x20, 0x30]);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.ff")).unwrap_err();
        assert!(matches!(err, DecodeError::Open { .. }));
    }
}
