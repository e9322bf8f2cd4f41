//! Bounded-chunk streaming of backend response bodies.
//!
//! [`ChunkedBody`] wraps the backend's body and re-frames every data frame
//! into pieces of at most `chunk_size` bytes. Frames are pulled from the
//! backend only when the caller polls, so a slow client applies
//! backpressure all the way to the backend connection. Splitting uses
//! `Bytes::split_to`, which shares the underlying buffer instead of copying.
//!
//! Dropping the body (normal completion, client disconnect, or error)
//! drops the inner body and with it the backend connection.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

/// Default relay chunk size.
pub const CHUNK_SIZE: usize = 8 * 1024;

pub struct ChunkedBody<B> {
    inner: Pin<Box<B>>,
    pending: Bytes,
    chunk_size: usize,
}

impl<B> ChunkedBody<B> {
    /// `chunk_size` of zero is treated as one byte.
    pub fn new(inner: B, chunk_size: usize) -> Self {
        Self {
            inner: Box::pin(inner),
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    fn next_chunk(&mut self) -> Bytes {
        let len = self.pending.len().min(self.chunk_size);
        self.pending.split_to(len)
    }
}

impl<B> Body for ChunkedBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, B::Error>>> {
        let this = self.get_mut();

        if !this.pending.is_empty() {
            return Poll::Ready(Some(Ok(Frame::data(this.next_chunk()))));
        }

        match ready!(this.inner.as_mut().poll_frame(cx)) {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => {
                    this.pending = data;
                    Poll::Ready(Some(Ok(Frame::data(this.next_chunk()))))
                }
                // trailers pass through untouched
                Err(frame) => Poll::Ready(Some(Ok(frame))),
            },
            other => Poll::Ready(other),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.pending.is_empty() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        let inner = self.inner.size_hint();
        let pending = self.pending.len() as u64;
        let mut hint = SizeHint::new();
        hint.set_lower(inner.lower() + pending);
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper + pending);
        }
        hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};

    async fn frame_sizes<B>(mut body: B) -> Vec<usize>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: std::fmt::Debug,
    {
        let mut sizes = Vec::new();
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame.unwrap().into_data() {
                sizes.push(data.len());
            }
        }
        sizes
    }

    #[tokio::test]
    async fn splits_large_frame() {
        let payload = Bytes::from(vec![7u8; 20_000]);
        let body = ChunkedBody::new(Full::new(payload), CHUNK_SIZE);
        assert_eq!(frame_sizes(body).await, vec![8192, 8192, 3616]);
    }

    #[tokio::test]
    async fn small_frames_untouched() {
        let inner = Frames(vec![
            Bytes::from_static(b"world"),
            Bytes::from_static(b"hello "),
        ]);
        let body = ChunkedBody::new(inner, CHUNK_SIZE);
        assert_eq!(frame_sizes(body).await, vec![6, 5]);
    }

    #[tokio::test]
    async fn preserves_bytes() {
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let body = ChunkedBody::new(Full::new(Bytes::from(payload.clone())), 1000);
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), payload.as_slice());
    }

    #[test]
    fn size_hint_is_exact_for_full_body() {
        let body = ChunkedBody::new(Full::new(Bytes::from_static(b"abcdef")), 4);
        assert_eq!(body.size_hint().exact(), Some(6));
    }

    #[test]
    fn empty_body_is_end_stream() {
        let body = ChunkedBody::new(http_body_util::Empty::<Bytes>::new(), CHUNK_SIZE);
        assert!(body.is_end_stream());
    }

    /// Yields the given chunks as separate data frames, last element first.
    struct Frames(Vec<Bytes>);

    impl Body for Frames {
        type Data = Bytes;
        type Error = std::convert::Infallible;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(self.0.pop().map(|data| Ok(Frame::data(data))))
        }
    }
}
