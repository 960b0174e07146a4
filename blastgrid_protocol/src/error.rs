// Error type for the wire layer.
//
// One enum covers everything that can go wrong while encoding or decoding:
// malformed input (unknown tag, bad direction, over-long string), fixed-mode
// underflow, trailing bytes in a datagram, and transport failures surfaced
// by a streaming source. `is_transport` is the split the runtime crates care
// about: a transport error means the connection is gone, anything else
// means the peer sent garbage.

use thiserror::Error;

/// Errors produced by the codec and the stream buffer.
#[derive(Debug, Error)]
pub enum WireError {
    /// A tag byte outside the declared variant set of a message family.
    #[error("unknown message id: {0}")]
    UnknownMessageId(u8),

    /// A direction byte greater than 3.
    #[error("invalid direction: {0}")]
    InvalidDirection(u8),

    /// A string longer than the 255-byte wire limit.
    #[error("string too long for the wire: {0} bytes")]
    StringTooLong(usize),

    /// A string on the wire that is not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidString,

    /// A sequence or mapping whose length does not fit the 4-byte count.
    #[error("sequence too long for the wire: {0} elements")]
    SequenceTooLong(usize),

    /// A fixed-mode buffer ran out of bytes mid-field.
    #[error("incomplete message: {missing} more bytes needed")]
    Incomplete { missing: usize },

    /// Bytes left over after decoding a complete message from a datagram.
    #[error("trailing bytes after message: {0}")]
    TrailingBytes(usize),

    /// The streaming source failed while refilling the buffer.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// True if the error came from the transport rather than from the
    /// contents of the message. Transport errors end the connection;
    /// content errors are protocol violations by the peer.
    pub fn is_transport(&self) -> bool {
        matches!(self, WireError::Io(_))
    }
}
