//! Splits a raw MJPEG byte stream into individual JPEG frames.

use bytes::{Buf, Bytes, BytesMut};

use super::StreamError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Largest frame accepted before the buffer is discarded.
pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

/// Accumulates bytes and yields complete `FFD8 .. FFD9` frames.
#[derive(Debug)]
pub struct MjpegSplitter {
    buf: BytesMut,
    max_frame: usize,
    /// Bytes after the start marker already searched for an end marker.
    scanned: usize,
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new(MAX_FRAME_BYTES)
    }
}

impl MjpegSplitter {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(64 * 1024),
            max_frame,
            scanned: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, StreamError> {
        let Some(start) = find_marker(&self.buf, &SOI) else {
            // A trailing 0xFF may be the first half of a marker.
            let keep = usize::from(self.buf.last() == Some(&0xFF));
            let discard = self.buf.len() - keep;
            self.buf.advance(discard);
            self.scanned = 0;
            return Ok(None);
        };
        if start > 0 {
            self.buf.advance(start);
            self.scanned = 0;
        }

        let body_len = self.buf.len() - SOI.len();
        match find_marker(&self.buf[SOI.len() + self.scanned..], &EOI) {
            Some(pos) => {
                let end = SOI.len() + self.scanned + pos + EOI.len();
                self.scanned = 0;
                Ok(Some(self.buf.split_to(end).freeze()))
            }
            None if self.buf.len() > self.max_frame => {
                let len = self.buf.len();
                self.buf.clear();
                self.scanned = 0;
                Err(StreamError::FrameTooLarge(len))
            }
            None => {
                // The last byte may still pair with the next push.
                self.scanned = body_len.saturating_sub(1);
                Ok(None)
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = SOI.to_vec();
        frame.extend_from_slice(body);
        frame.extend_from_slice(&EOI);
        frame
    }

    fn drain(splitter: &mut MjpegSplitter) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = splitter.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn frames_split_across_reads_are_reassembled() {
        let stream = [jpeg(b"first"), jpeg(b"second")].concat();
        for chunk_size in [1, 2, 3, 7, stream.len()] {
            let mut splitter = MjpegSplitter::default();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                splitter.push(chunk);
                frames.extend(drain(&mut splitter));
            }
            assert_eq!(frames, vec![Bytes::from(jpeg(b"first")), Bytes::from(jpeg(b"second"))]);
            assert_eq!(splitter.buffered(), 0);
        }
    }

    #[test]
    fn junk_before_start_marker_is_skipped() {
        let mut splitter = MjpegSplitter::default();
        splitter.push(b"garbage");
        assert!(splitter.next_frame().unwrap().is_none());
        assert_eq!(splitter.buffered(), 0);

        splitter.push(&[b"more".as_slice(), &jpeg(b"x")].concat());
        assert_eq!(splitter.next_frame().unwrap(), Some(Bytes::from(jpeg(b"x"))));
    }

    #[test]
    fn trailing_marker_byte_is_kept() {
        let mut splitter = MjpegSplitter::default();
        splitter.push(&[0x00, 0xFF]);
        assert!(splitter.next_frame().unwrap().is_none());
        splitter.push(&[0xD8, 0x01, 0xFF, 0xD9]);
        assert_eq!(
            splitter.next_frame().unwrap(),
            Some(Bytes::from_static(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]))
        );
    }

    #[test]
    fn partial_frame_is_not_rescanned() {
        let mut splitter = MjpegSplitter::default();
        splitter.push(&SOI);
        splitter.push(&[0u8; 100]);
        assert!(splitter.next_frame().unwrap().is_none());
        assert_eq!(splitter.scanned, 99);

        // The end marker straddles the previous scan boundary.
        splitter.push(&[0xFF]);
        assert!(splitter.next_frame().unwrap().is_none());
        assert_eq!(splitter.scanned, 100);
        splitter.push(&[0xD9, 0xFF, 0xD8]);
        let frame = splitter.next_frame().unwrap().expect("complete frame");
        assert_eq!(frame.len(), SOI.len() + 101 + 1);
        assert_eq!(splitter.scanned, 0);
        assert_eq!(splitter.buffered(), 2);
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let mut splitter = MjpegSplitter::new(16);
        splitter.push(&SOI);
        splitter.push(&[0u8; 32]);
        assert!(matches!(splitter.next_frame(), Err(StreamError::FrameTooLarge(34))));
        assert_eq!(splitter.buffered(), 0);
    }
}
