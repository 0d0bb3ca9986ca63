use std::sync::Arc;

use async_stream::try_stream;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};

use crate::error::Error;

/// Producer behind a [`Cursor`]: opens the upstream message stream and turns
/// each raw message into the item handed to the caller.
pub trait CursorSource: Send + Sync + 'static {
    type Message: Send + 'static;
    type Item: Send + 'static;

    /// Opens a fresh upstream stream. Called once on construction and once
    /// per [`Cursor::reset`].
    fn initialize(&self) -> BoxStream<'static, Result<Self::Message, Error>>;

    fn transform(&self, message: Self::Message) -> Result<Self::Item, Error>;
}

enum CursorState<M> {
    Ready(BoxStream<'static, Result<M, Error>>),
    Closed,
}

/// Single-use view over a server-push stream.
///
/// The upstream stream is acquired when the cursor is created. The first
/// call to [`Cursor::stream`] or [`Cursor::to_array`] takes it; any further
/// call fails with [`Error::CursorInUse`] until [`Cursor::reset`] opens a new
/// one, which issues a new upstream request.
pub struct Cursor<S: CursorSource> {
    source: Arc<S>,
    state: CursorState<S::Message>,
}

impl<S: CursorSource> Cursor<S> {
    pub fn new(source: S) -> Self {
        let state = CursorState::Ready(source.initialize());
        log::trace!("cursor ready");
        Self {
            source: Arc::new(source),
            state,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }

    /// Takes the upstream stream. Items keep the upstream order.
    pub fn stream(&mut self) -> Result<BoxStream<'static, Result<S::Item, Error>>, Error> {
        let state = std::mem::replace(&mut self.state, CursorState::Closed);
        let CursorState::Ready(mut upstream) = state else {
            return Err(Error::CursorInUse);
        };
        log::trace!("cursor closed, streaming");

        let source = self.source.clone();
        Ok(Box::pin(try_stream! {
            while let Some(message) = upstream.next().await {
                yield source.transform(message?)?;
            }
        }))
    }

    /// Collects every item, failing on the first upstream or transform error.
    pub async fn to_array(&mut self) -> Result<Vec<S::Item>, Error> {
        self.stream()?.try_collect().await
    }

    pub fn reset(&mut self) {
        self.state = CursorState::Ready(self.source.initialize());
        log::trace!("cursor reset");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;

    #[derive(Default)]
    struct Pages {
        runs: AtomicUsize,
    }

    impl CursorSource for Pages {
        type Message = u32;
        type Item = String;

        fn initialize(&self) -> BoxStream<'static, Result<u32, Error>> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) as u32;
            Box::pin(stream::iter((0..3).map(move |page| Ok(run * 10 + page))))
        }

        fn transform(&self, message: u32) -> Result<String, Error> {
            Ok(format!("page-{message}"))
        }
    }

    struct Failing;

    impl CursorSource for Failing {
        type Message = u32;
        type Item = u32;

        fn initialize(&self) -> BoxStream<'static, Result<u32, Error>> {
            Box::pin(stream::iter(vec![
                Ok(1),
                Err(Error::TransportError("connection reset".to_string())),
                Ok(3),
            ]))
        }

        fn transform(&self, message: u32) -> Result<u32, Error> {
            Ok(message)
        }
    }

    #[tokio::test]
    async fn second_consumption_needs_reset() {
        let mut cursor = Cursor::new(Pages::default());
        assert!(!cursor.is_closed());
        assert_eq!(
            cursor.to_array().await.unwrap(),
            ["page-0", "page-1", "page-2"]
        );
        assert!(cursor.is_closed());
        assert!(matches!(cursor.to_array().await, Err(Error::CursorInUse)));
        assert!(matches!(cursor.stream(), Err(Error::CursorInUse)));

        cursor.reset();
        assert_eq!(
            cursor.to_array().await.unwrap(),
            ["page-10", "page-11", "page-12"]
        );
    }

    #[tokio::test]
    async fn stream_closes_before_first_item() {
        let mut cursor = Cursor::new(Pages::default());
        let mut items = cursor.stream().unwrap();
        assert!(matches!(cursor.to_array().await, Err(Error::CursorInUse)));
        assert_eq!(items.next().await.unwrap().unwrap(), "page-0");
    }

    #[tokio::test]
    async fn upstream_errors_reject_to_array() {
        let mut cursor = Cursor::new(Failing);
        assert!(matches!(
            cursor.to_array().await,
            Err(Error::TransportError(_))
        ));
    }
}
