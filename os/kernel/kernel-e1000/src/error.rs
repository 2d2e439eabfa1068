use core::fmt::Debug;

/// Why [`E1000::transmit`](crate::E1000::transmit) refused a packet.
///
/// The rejected buffer travels back inside the error; the caller decides
/// whether to retry or free it.
#[derive(Debug, thiserror::Error)]
pub enum TransmitError<B: Debug> {
    /// The NIC has not yet retired the descriptor at the ring tail.
    #[error("transmit ring full at slot {slot}")]
    RingFull { slot: usize, buffer: B },

    /// The payload does not fit a descriptor's 16-bit length field.
    #[error("{len}-byte packet does not fit a transmit descriptor")]
    Oversized { len: usize, buffer: B },
}

impl<B: Debug> TransmitError<B> {
    /// Takes back the rejected buffer.
    #[must_use]
    pub fn into_buffer(self) -> B {
        match self {
            Self::RingFull { buffer, .. } | Self::Oversized { buffer, .. } => buffer,
        }
    }
}

/// Payload edits that would leave the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MbufError {
    #[error("mbuf: cannot push {requested} bytes with {available} bytes of headroom")]
    NoHeadroom { requested: usize, available: usize },

    #[error("mbuf: cannot put {requested} bytes with {available} bytes of tailroom")]
    NoTailroom { requested: usize, available: usize },

    #[error("mbuf: cannot remove {requested} bytes from a {len}-byte payload")]
    TooShort { requested: usize, len: usize },
}
