// Byte buffer feeding the decoder, with two modes.
//
// Fixed mode wraps an exact datagram payload: underflow is a logical
// `Incomplete` error and the caller is expected to `finish()` the buffer to
// reject trailing bytes. Streaming mode couples the buffer to any
// `std::io::Read` source; when the decoder asks for more bytes than are
// buffered, the deficit is read with `read_exact`, so a short read surfaces
// as a transport error.
//
// There is no outer framing here. TCP message boundaries are discovered by
// decoding (the codec is self-delimiting), so the buffer only refills and
// compacts. Endianness conversion happens in `codec.rs` on the arrays this
// module hands out.

use std::collections::VecDeque;
use std::io::Read;

use crate::error::WireError;

/// Decoder input buffer. `R` is the streaming byte source; fixed-mode
/// buffers have no source and default the parameter away.
pub struct StreamBuffer<R = std::io::Empty> {
    buf: VecDeque<u8>,
    source: Option<R>,
}

impl StreamBuffer {
    /// Wrap an exact datagram payload. Underflow yields
    /// `WireError::Incomplete`; leftover bytes are reported by `finish`.
    pub fn fixed(data: &[u8]) -> StreamBuffer {
        StreamBuffer {
            buf: data.iter().copied().collect(),
            source: None,
        }
    }
}

impl<R: Read> StreamBuffer<R> {
    /// Couple the buffer to a blocking byte source (a `TcpStream`, a
    /// `Cursor` in tests). The source must deliver exactly the requested
    /// bytes or fail.
    pub fn streaming(source: R) -> Self {
        Self {
            buf: VecDeque::new(),
            source: Some(source),
        }
    }

    /// Take the next `N` bytes as a fixed array, refilling from the source
    /// if the buffer holds fewer than `N`.
    pub fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        for (dst, src) in out.iter_mut().zip(self.buf.drain(..N)) {
            *dst = src;
        }
        Ok(out)
    }

    /// Take the next `n` bytes as an owned vector.
    pub fn take_bytes(&mut self, n: usize) -> Result<Vec<u8>, WireError> {
        self.ensure(n)?;
        Ok(self.buf.drain(..n).collect())
    }

    /// Number of buffered bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Reject leftover bytes after a complete message. Only meaningful in
    /// fixed mode, where a datagram must be consumed exactly.
    pub fn finish(&self) -> Result<(), WireError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(WireError::TrailingBytes(self.buf.len()))
        }
    }

    fn ensure(&mut self, want: usize) -> Result<(), WireError> {
        if self.buf.len() >= want {
            return Ok(());
        }
        let missing = want - self.buf.len();
        match &mut self.source {
            Some(source) => {
                let mut chunk = vec![0u8; missing];
                source.read_exact(&mut chunk)?;
                self.buf.extend(chunk);
                Ok(())
            }
            None => Err(WireError::Incomplete { missing }),
        }
    }
}
