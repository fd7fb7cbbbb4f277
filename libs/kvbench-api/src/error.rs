/// Decoding failures for a single datagram. The receiving side drops the
/// datagram and keeps going; nothing here is fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("frame length {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("unknown op code {0}")]
    UnknownOp(u32),

    #[error("value is {actual} bytes, layout expects {expected}")]
    ValueSize { expected: usize, actual: usize },
}
