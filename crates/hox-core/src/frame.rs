//! Framing for the HOX wire protocol.
//!
//! The server terminates every event with a blank line, so one frame on the
//! wire is `<body>\n\n`. Requests travel the other way as a single line with
//! a trailing `\n`.
//!
//! [`FrameCodec`] plugs into `tokio_util::codec` so the transport can feed it
//! a growing [`BytesMut`] and pull complete event bodies out of it.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Incremental scanner for `\n\n`-terminated event frames.
///
/// Remembers how far into the buffer it has already looked, so a frame
/// boundary split across two reads is neither rescanned nor lost.
#[derive(Debug, Default, Clone)]
pub struct FrameCodec {
    /// Bytes of the buffer already examined for a terminator.
    scanned: usize,
    /// The last examined byte was a `\n`.
    saw_newline: bool,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any partial scan. Call when the underlying buffer is cleared.
    pub fn reset(&mut self) {
        self.scanned = 0;
        self.saw_newline = false;
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        while self.scanned < buf.len() {
            let byte = buf[self.scanned];
            self.scanned += 1;

            if byte != b'\n' {
                self.saw_newline = false;
                continue;
            }
            if !self.saw_newline {
                self.saw_newline = true;
                continue;
            }

            // `buf[..scanned]` is `<body>\n\n`.
            let frame = buf.split_to(self.scanned);
            self.reset();
            let body = &frame[..frame.len() - 2];
            return Ok(Some(String::from_utf8_lossy(body).into_owned()));
        }
        Ok(None)
    }
}

impl Encoder<String> for FrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(codec: &mut FrameCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            out.push(frame);
        }
        out
    }

    const STREAM: &str = "op=LOGIN&code=0&content=bob;1500\n\n\
                          op=LIST&code=0&content=1;0;0;900/180/20;900;900;;0;;0\n2;0;0;600/60/20;600;600;ann;1620;;0\n\n\
                          op=MOVE&code=0&content=7;0;1242&tid=7\n\n";

    const BODIES: [&str; 3] = [
        "op=LOGIN&code=0&content=bob;1500",
        "op=LIST&code=0&content=1;0;0;900/180/20;900;900;;0;;0\n2;0;0;600/60/20;600;600;ann;1620;;0",
        "op=MOVE&code=0&content=7;0;1242&tid=7",
    ];

    #[test]
    fn whole_stream_in_one_read() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(STREAM);
        assert_eq!(drain(&mut codec, &mut buf), BODIES);
        assert!(buf.is_empty());
    }

    #[test]
    fn every_chunk_size_yields_same_frames() {
        let bytes = STREAM.as_bytes();
        for chunk in 1..=bytes.len() {
            let mut codec = FrameCodec::new();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();
            for piece in bytes.chunks(chunk) {
                buf.extend_from_slice(piece);
                frames.extend(drain(&mut codec, &mut buf));
            }
            assert_eq!(frames, BODIES, "chunk size {chunk}");
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn partial_frame_waits_for_terminator() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("op=RESET&code=0&content=7\n");
        assert!(drain(&mut codec, &mut buf).is_empty());
        assert_eq!(buf.len(), "op=RESET&code=0&content=7\n".len());

        buf.extend_from_slice(b"\nop=DRAW");
        assert_eq!(drain(&mut codec, &mut buf), ["op=RESET&code=0&content=7"]);
        assert_eq!(&buf[..], b"op=DRAW");
    }

    #[test]
    fn single_newlines_stay_inside_body() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("a\nb\nc\n\n");
        assert_eq!(drain(&mut codec, &mut buf), ["a\nb\nc"]);
    }

    #[test]
    fn reset_discards_scan_progress() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from("stale\n");
        assert!(drain(&mut codec, &mut buf).is_empty());

        buf.clear();
        codec.reset();
        buf.extend_from_slice(b"\nfresh\n\n");
        assert_eq!(drain(&mut codec, &mut buf), ["\nfresh"]);
    }

    #[test]
    fn encoder_appends_line_terminator() {
        let mut codec = FrameCodec::new();
        let mut dst = BytesMut::new();
        codec.encode("op=LIST&pid=bob".to_string(), &mut dst).unwrap();
        assert_eq!(&dst[..], b"op=LIST&pid=bob\n");
    }
}
