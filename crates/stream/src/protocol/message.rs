use bytes::{Buf, Bytes};

/// A single event crossing the codec boundary.
///
/// Inbound, the codec yields `Message<RequestHeader>`; outbound, the adapter
/// writes `Message<ResponseHead>`. Every message is a head followed by zero
/// or more [`PayloadItem::Chunk`]s and exactly one [`PayloadItem::Eof`].
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// Body event of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    /// Terminates the body, also sent for body-less messages
    Eof,
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Number of payload bytes carried by this item, zero for `Eof`
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            PayloadItem::Chunk(data) => data.remaining(),
            PayloadItem::Eof => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_counts_only_chunks() {
        let chunk: PayloadItem = PayloadItem::Chunk(Bytes::from_static(b"hello"));
        assert_eq!(chunk.size(), 5);
        assert!(!chunk.is_eof());

        let eof: PayloadItem = PayloadItem::Eof;
        assert_eq!(eof.size(), 0);
        assert!(eof.is_eof());
    }
}
