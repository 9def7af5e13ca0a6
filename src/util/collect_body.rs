use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BufMut, Bytes};
use futures::{ready, Future};
use http_body::Body;
use pin_project::pin_project;

use super::BoxError;

/// A `Future` that reads an HTTP body to end and yields its content as one `Bytes`.
#[pin_project]
pub struct CollectBody<B> {
    #[pin]
    body: B,
    state: State,
}

enum State {
    Init,
    Once(Bytes),
    Streaming(Vec<u8>),
}

impl<B: Body> CollectBody<B>
where
    B::Error: Into<BoxError>,
{
    pub fn new(body: B) -> Self {
        CollectBody {
            body,
            state: State::Init,
        }
    }
}

impl<B: Body> Future for CollectBody<B>
where
    B::Error: Into<BoxError>,
{
    type Output = Result<Bytes, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        while let Some(result) = ready!(this.body.as_mut().poll_data(cx)) {
            let mut data = result.map_err(Into::into)?;
            match *this.state {
                State::Init => *this.state = State::Once(data.copy_to_bytes(data.remaining())),
                State::Once(ref mut first) => {
                    let cap = first.remaining()
                        + data.remaining()
                        + this.body.size_hint().lower().try_into().unwrap_or(0);
                    let mut buf = Vec::with_capacity(cap);
                    buf.put(first);
                    buf.put(data);
                    *this.state = State::Streaming(buf);
                }
                State::Streaming(ref mut buf) => buf.put(data),
            }
        }

        Poll::Ready(Ok(match mem::replace(this.state, State::Init) {
            State::Init => Bytes::new(),
            State::Once(buf) => buf,
            State::Streaming(buf) => buf.into(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[tokio::test]
    async fn concatenates_chunks() {
        let chunks: Vec<Result<_, std::io::Error>> = vec![Ok("<feed"), Ok(">"), Ok("</feed>")];
        let body = hyper::Body::wrap_stream(stream::iter(chunks));
        let bytes = CollectBody::new(body).await.unwrap();
        assert_eq!(bytes, "<feed></feed>");
    }

    #[tokio::test]
    async fn empty_body() {
        let bytes = CollectBody::new(hyper::Body::empty()).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn propagates_body_error() {
        let chunks: Vec<Result<&str, std::io::Error>> = vec![
            Ok("partial"),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        ];
        let body = hyper::Body::wrap_stream(stream::iter(chunks));
        assert!(CollectBody::new(body).await.is_err());
    }
}
