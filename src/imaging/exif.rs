//! EXIF relocation for re-encoded JPEGs.
//!
//! Generic encoders throw metadata away. To keep it, the APP1 segment is lifted
//! out of the source bytes with [`extract_exif`] and written back by
//! [`inject_exif`] in front of the new encoder output:
//!
//! ```text
//! FF D8 | FF E1 <len:u16 BE> <payload> | <encoder output without its FF D8>
//! ```
//!
//! The encoder's own SOI is dropped by a [`SkipWriter`], so the result carries
//! exactly one SOI with EXIF as the first segment.

use std::io::{self, Write};

/// Start Of Image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];
/// APP1 marker, conventionally EXIF.
pub const APP1: [u8; 2] = [0xFF, 0xE1];
/// Only this many leading bytes are searched for APP1.
pub const SCAN_WINDOW: usize = 65536;
/// Largest payload a 16-bit segment length (which counts itself) can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - 2;

/// Raw APP1 payload, without the marker and length bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifSegment(Vec<u8>);

impl ExifSegment {
    /// Wrap a payload. `None` if it is empty or too long for one segment.
    pub fn new(payload: Vec<u8>) -> Option<Self> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD {
            return None;
        }
        Some(Self(payload))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The 4-byte segment header: marker plus big-endian length.
    fn header(&self) -> [u8; 4] {
        // new() guarantees the length fits
        let [hi, lo] = ((self.0.len() + 2) as u16).to_be_bytes();
        [APP1[0], APP1[1], hi, lo]
    }
}

/// Find the first complete APP1 segment within the first [`SCAN_WINDOW`] bytes.
///
/// A marker whose length runs past the window (or is shorter than the length
/// field itself) is skipped and the scan continues. Returns `None` when no
/// complete, non-empty segment is found; missing EXIF is not an error.
pub fn extract_exif(data: &[u8]) -> Option<ExifSegment> {
    let window = &data[..data.len().min(SCAN_WINDOW)];

    let mut from = 0;
    while let Some(offset) = find_marker(window, APP1, from) {
        from = offset + 1;

        let Some(&[hi, lo]) = window.get(offset + 2..offset + 4) else {
            continue;
        };
        let length = u16::from_be_bytes([hi, lo]) as usize;
        if length < 2 {
            continue;
        }
        if let Some(payload) = window.get(offset + 4..offset + 2 + length) {
            return ExifSegment::new(payload.to_vec());
        }
    }
    None
}

/// Position of the next `marker` at or after `from`.
fn find_marker(data: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|w| w == marker)
        .map(|pos| from + pos)
}

/// Write a JPEG with `segment` spliced in as the first segment.
///
/// `encode` receives the writer to produce a complete JPEG into. With a
/// segment present it sees a [`SkipWriter`] that swallows its SOI; without
/// one its output goes through untouched.
pub fn inject_exif<W, E, F>(writer: W, segment: Option<&ExifSegment>, encode: F) -> Result<W, E>
where
    W: Write,
    E: From<io::Error>,
    F: FnOnce(&mut dyn Write) -> Result<(), E>,
{
    let mut writer = writer;
    let Some(segment) = segment else {
        encode(&mut writer)?;
        return Ok(writer);
    };

    writer.write_all(&SOI)?;
    writer.write_all(&segment.header())?;
    writer.write_all(segment.as_bytes())?;

    let mut skipper = SkipWriter::new(writer, SOI.len());
    encode(&mut skipper)?;
    Ok(skipper.into_inner())
}

/// Writer decorator that discards the first `n` bytes written through it.
///
/// Skipped bytes are reported as written so callers using `write_all` see
/// progress. Skips can span any number of `write` calls.
#[derive(Debug)]
pub struct SkipWriter<W> {
    inner: W,
    remaining: usize,
}

impl<W: Write> SkipWriter<W> {
    pub fn new(inner: W, skip: usize) -> Self {
        Self {
            inner,
            remaining: skip,
        }
    }

    /// Bytes still to be discarded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for SkipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return self.inner.write(buf);
        }

        if buf.len() <= self.remaining {
            self.remaining -= buf.len();
            return Ok(buf.len());
        }

        let skipped = self.remaining;
        let written = self.inner.write(&buf[skipped..])?;
        self.remaining = 0;
        Ok(skipped + written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tiny JPEG-shaped stream: SOI, APP1 with `payload`, then filler.
    fn jpeg_with_app1(payload: &[u8]) -> Vec<u8> {
        let mut data = SOI.to_vec();
        data.extend_from_slice(&APP1);
        data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(payload);
        data.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x04, 0x01, 0x02]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    /// Pretend encoder output: SOI followed by a fake body.
    fn fake_encoder_output() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, 0xFF, 0xD9]
    }

    // =========================================================================
    // extract_exif
    // =========================================================================

    #[test]
    fn extracts_payload_after_header() {
        let payload = b"Exif\0\0MM\0*payload";
        let segment = extract_exif(&jpeg_with_app1(payload)).unwrap();
        assert_eq!(segment.as_bytes(), payload);
    }

    #[test]
    fn no_app1_is_none() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02, 0xFF, 0xD9];
        assert_eq!(extract_exif(&data), None);
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(extract_exif(&[]), None);
        assert_eq!(extract_exif(&[0xFF]), None);
    }

    #[test]
    fn marker_without_length_bytes_is_none() {
        assert_eq!(extract_exif(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00]), None);
    }

    #[test]
    fn truncated_segment_is_none() {
        // Claims 100 bytes but only 4 follow
        let data = [0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x64, 1, 2, 3, 4];
        assert_eq!(extract_exif(&data), None);
    }

    #[test]
    fn empty_payload_is_none() {
        assert_eq!(extract_exif(&jpeg_with_app1(&[])), None);
    }

    #[test]
    fn bogus_length_is_skipped_and_scan_continues() {
        // First FF E1 has length 0, the real segment follows
        let mut data = vec![0xFF, 0xE1, 0x00, 0x00];
        data.extend_from_slice(&jpeg_with_app1(b"Exif\0\0ok"));
        let segment = extract_exif(&data).unwrap();
        assert_eq!(segment.as_bytes(), b"Exif\0\0ok");
    }

    #[test]
    fn segment_past_window_is_ignored() {
        let mut data = vec![0u8; SCAN_WINDOW - 8];
        data.extend_from_slice(&jpeg_with_app1(b"Exif\0\0too late"));
        assert_eq!(extract_exif(&data), None);
    }

    #[test]
    fn segment_ending_exactly_at_window_is_found() {
        let payload = b"Exif\0\0edge";
        // Marker at offset such that offset + 2 + length == SCAN_WINDOW
        let offset = SCAN_WINDOW - 4 - payload.len();
        let mut data = vec![0u8; offset];
        data.extend_from_slice(&APP1);
        data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(payload);
        data.extend_from_slice(&[0u8; 16]);
        assert_eq!(extract_exif(&data).unwrap().as_bytes(), payload);
    }

    // =========================================================================
    // ExifSegment
    // =========================================================================

    #[test]
    fn segment_rejects_oversized_payload() {
        assert!(ExifSegment::new(vec![0; MAX_PAYLOAD]).is_some());
        assert!(ExifSegment::new(vec![0; MAX_PAYLOAD + 1]).is_none());
        assert!(ExifSegment::new(Vec::new()).is_none());
    }

    #[test]
    fn header_length_counts_itself() {
        let segment = ExifSegment::new(vec![0; 300]).unwrap();
        assert_eq!(segment.header(), [0xFF, 0xE1, 0x01, 0x2E]);
    }

    // =========================================================================
    // SkipWriter
    // =========================================================================

    #[test]
    fn skip_writer_drops_leading_bytes_in_one_write() {
        let mut w = SkipWriter::new(Vec::new(), 2);
        assert_eq!(w.write(&[1, 2, 3, 4]).unwrap(), 4);
        assert_eq!(w.into_inner(), vec![3, 4]);
    }

    #[test]
    fn skip_writer_spans_multiple_writes() {
        let mut w = SkipWriter::new(Vec::new(), 3);
        assert_eq!(w.write(&[1]).unwrap(), 1);
        assert_eq!(w.remaining(), 2);
        assert_eq!(w.write(&[2]).unwrap(), 1);
        assert_eq!(w.write(&[3, 4, 5]).unwrap(), 3);
        w.write_all(&[6]).unwrap();
        assert_eq!(w.remaining(), 0);
        assert_eq!(w.into_inner(), vec![4, 5, 6]);
    }

    #[test]
    fn skip_writer_exact_boundary() {
        let mut w = SkipWriter::new(Vec::new(), 2);
        w.write_all(&[0xFF, 0xD8]).unwrap();
        w.write_all(&[0xFF, 0xDB]).unwrap();
        assert_eq!(w.into_inner(), vec![0xFF, 0xDB]);
    }

    #[test]
    fn skip_writer_zero_is_passthrough() {
        let mut w = SkipWriter::new(Vec::new(), 0);
        w.write_all(b"abc").unwrap();
        assert_eq!(w.into_inner(), b"abc");
    }

    // =========================================================================
    // inject_exif
    // =========================================================================

    #[test]
    fn inject_without_segment_is_verbatim() {
        let out = inject_exif(Vec::new(), None, |w| -> io::Result<()> {
            w.write_all(&fake_encoder_output())
        })
        .unwrap();
        assert_eq!(out, fake_encoder_output());
    }

    #[test]
    fn inject_places_exif_first_with_single_soi() {
        let segment = ExifSegment::new(b"Exif\0\0II*\0".to_vec()).unwrap();
        let out = inject_exif(Vec::new(), Some(&segment), |w| -> io::Result<()> {
            // Byte-at-a-time to exercise the split skip
            for b in fake_encoder_output() {
                w.write_all(&[b])?;
            }
            Ok(())
        })
        .unwrap();

        let mut expected = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x0C];
        expected.extend_from_slice(b"Exif\0\0II*\0");
        expected.extend_from_slice(&fake_encoder_output()[2..]);
        assert_eq!(out, expected);
        assert_eq!(out.windows(2).filter(|w| *w == SOI).count(), 1);
    }

    #[test]
    fn extract_then_inject_reproduces_segment() {
        let payload = b"Exif\0\0MM\0*\0\0\0\x08orientation";
        let source = jpeg_with_app1(payload);
        let segment = extract_exif(&source);

        let out = inject_exif(Vec::new(), segment.as_ref(), |w| -> io::Result<()> {
            w.write_all(&fake_encoder_output())
        })
        .unwrap();

        assert_eq!(&out[..2], &SOI);
        assert_eq!(&out[2..4], &APP1);
        assert_eq!(
            u16::from_be_bytes([out[4], out[5]]) as usize,
            payload.len() + 2
        );
        assert_eq!(&out[6..6 + payload.len()], payload);
        assert_ne!(&out[6 + payload.len()..8 + payload.len()], &SOI);
    }

    #[test]
    fn encoder_error_propagates() {
        let segment = ExifSegment::new(b"Exif\0\0".to_vec()).unwrap();
        let result = inject_exif(Vec::new(), Some(&segment), |_| -> io::Result<()> {
            Err(io::Error::other("encoder rejected pixels"))
        });
        assert!(result.is_err());
    }
}
