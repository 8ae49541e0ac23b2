//! MJPEG stream splitting.
//!
//! An MJPEG recording is a back-to-back concatenation of baseline JPEG
//! images. Frames are recovered by walking the JPEG marker structure
//! rather than scanning for raw `FFD8`/`FFD9` byte pairs: inside
//! entropy-coded data `FF` is always stuffed (`FF00`) or a restart marker,
//! so tracking segments is what makes the split reliable.

use std::fs;
use std::path::Path;

use thiserror::Error;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

#[derive(Debug, Error)]
pub enum MjpegError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Iterator over complete JPEG frames of an MJPEG byte stream.
///
/// A truncated trailing frame (recording killed mid-write) is dropped
/// silently; everything up to it is still yielded.
pub struct Frames<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Frames<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let start = find_soi(self.data, self.pos)?;
        let end = frame_end(self.data, start)?;
        self.pos = end;
        Some(&self.data[start..end])
    }
}

/// Split a byte stream into its complete JPEG frames.
pub fn split_frames(data: &[u8]) -> Vec<&[u8]> {
    Frames::new(data).collect()
}

/// Number of complete frames in an MJPEG file.
pub fn count_frames(path: &Path) -> Result<usize, MjpegError> {
    let data = fs::read(path).map_err(|source| MjpegError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Frames::new(&data).count())
}

fn find_soi(data: &[u8], mut pos: usize) -> Option<usize> {
    while pos + 1 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == SOI {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Walk one JPEG starting at an SOI marker; return the offset one past its
/// EOI, or None if the frame is incomplete.
fn frame_end(data: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 2;
    loop {
        if i + 1 >= data.len() {
            return None;
        }
        if data[i] != 0xFF {
            // Lost marker alignment; the frame is unusable.
            return None;
        }
        let marker = data[i + 1];
        i += 2;
        match marker {
            EOI => return Some(i),
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD7 | SOI => continue,
            _ => {
                if i + 1 >= data.len() {
                    return None;
                }
                let len = u16::from_be_bytes([data[i], data[i + 1]]) as usize;
                if len < 2 {
                    return None;
                }
                i += len;
                if marker == SOS {
                    i = skip_entropy(data, i)?;
                }
            }
        }
    }
}

/// Advance past entropy-coded data to the next real marker. Stuffed zero
/// bytes and restart markers belong to the scan data.
fn skip_entropy(data: &[u8], mut i: usize) -> Option<usize> {
    while i + 1 < data.len() {
        if data[i] == 0xFF {
            let next = data[i + 1];
            if next != 0x00 && !(0xD0..=0xD7).contains(&next) {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal structurally-valid JPEG: SOI, one APP0 segment, SOS header,
    /// entropy data with a stuffed FF and a restart marker, EOI.
    fn fake_jpeg(fill: u8) -> Vec<u8> {
        let mut f = vec![0xFF, 0xD8];
        f.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, b'J', b'F']);
        f.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        f.extend_from_slice(&[fill, 0xFF, 0x00, fill, 0xFF, 0xD1, fill, fill]);
        f.extend_from_slice(&[0xFF, 0xD9]);
        f
    }

    #[test]
    fn splits_concatenated_frames() {
        let a = fake_jpeg(0x11);
        let b = fake_jpeg(0x22);
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let frames = split_frames(&stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], a.as_slice());
        assert_eq!(frames[1], b.as_slice());
    }

    #[test]
    fn drops_truncated_trailing_frame() {
        let a = fake_jpeg(0x33);
        let mut stream = a.clone();
        let partial = fake_jpeg(0x44);
        stream.extend_from_slice(&partial[..partial.len() - 4]);

        let frames = split_frames(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], a.as_slice());
    }

    #[test]
    fn empty_stream_has_no_frames() {
        assert!(split_frames(&[]).is_empty());
        assert!(split_frames(&[0x00, 0x01, 0x02]).is_empty());
    }

    #[test]
    fn stuffed_ff_bytes_do_not_end_a_frame() {
        // The entropy section contains FF00 and a restart marker; neither
        // may terminate the frame early.
        let frame = fake_jpeg(0xAB);
        let frames = split_frames(&frame);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), frame.len());
    }

    #[test]
    fn counts_frames_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for fill in [0x01, 0x02, 0x03] {
            file.write_all(&fake_jpeg(fill)).unwrap();
        }
        file.flush().unwrap();
        assert_eq!(count_frames(file.path()).unwrap(), 3);
    }
}
