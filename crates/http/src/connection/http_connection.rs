use std::error::Error;
use std::fmt::Display;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

/// Read buffer capacity; the buffer is reused across every request of a
/// keep-alive connection
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Preallocation cap when buffering a request body, so a hostile
/// Content-Length can't reserve memory up front
const BODY_PREALLOC_LIMIT: usize = 64 * 1024;

/// An HTTP connection that manages request processing and response writing
///
/// `HttpConnection` handles the full lifecycle of an HTTP connection:
/// - Reading and decoding requests, tolerant of arbitrarily split input
/// - Buffering each request body before dispatch, so handlers run strictly
///   one at a time per connection and the stream stays framed
/// - Honoring keep-alive: the loop continues only when the request allows it
/// - Writing responses and shutting the write side down gracefully on the
///   non-error path
///
/// The framed read buffer and the decoder are created once per connection
/// and reused for every request on it.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_timeouts(reader, writer, None, None)
    }

    /// Creates a connection whose reads and writes are bounded by the given
    /// timeouts. Expiry follows the same teardown path as an I/O error.
    pub fn with_timeouts(reader: R, writer: W, read_timeout: Option<Duration>, write_timeout: Option<Duration>) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            read_timeout,
            write_timeout,
        }
    }

    /// Drives the connection until it closes.
    ///
    /// Returns `Ok(())` on a clean close (end of stream between requests, or
    /// a request that does not permit keep-alive). Any protocol or I/O error
    /// tears the connection down and is returned to the caller; it never
    /// affects other connections.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.next_message().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    let keep_alive = self.do_process(header, payload_size, &handler).await?;
                    if !keep_alive {
                        info!("request does not allow keep-alive, connection shutdown");
                        self.shutdown().await;
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("received body frame while expecting a request head");
                    let error_response = build_error_response(StatusCode::BAD_REQUEST);
                    self.do_send_response(error_response).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    if !matches!(e, ParseError::IncompleteRequest) {
                        // best effort; the connection is torn down either way
                        let error_response = build_error_response(StatusCode::BAD_REQUEST);
                        self.do_send_response(error_response).await?;
                    }
                    return Err(e.into());
                }

                None => {
                    info!("no more requests, connection shutdown");
                    self.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Handles one request: buffers the body, dispatches, sends the response.
    ///
    /// Returns whether the connection may be reused for the next request.
    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &Arc<H>) -> Result<bool, HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let keep_alive = header.keep_alive();

        // the body is drained completely here, before dispatch, so the next
        // request's parse never starts on body bytes
        let body = match self.read_body(payload_size).await {
            Ok(body) => body,
            Err(e @ ParseError::IncompleteRequest) => {
                // the peer is gone, a response can't be delivered
                return Err(e.into());
            }
            Err(e) => {
                error!("can't read request body, cause {}", e);
                let error_response = build_error_response(StatusCode::BAD_REQUEST);
                self.do_send_response(error_response).await?;
                return Err(e.into());
            }
        };

        let request = header.body(body);
        let response_result = handler.call(request).await;
        self.send_response(response_result).await?;

        Ok(keep_alive)
    }

    /// Awaits the next decoded frame, applying the read timeout when set.
    async fn next_message(&mut self) -> Option<Result<Message<(RequestHeader, PayloadSize)>, ParseError>> {
        match self.read_timeout {
            Some(read_timeout) => match time::timeout(read_timeout, self.framed_read.next()).await {
                Ok(next) => next,
                Err(_elapsed) => Some(Err(ParseError::io(io::Error::new(ErrorKind::TimedOut, "read timed out")))),
            },
            None => self.framed_read.next().await,
        }
    }

    /// Collects the request's payload frames into a single buffer.
    async fn read_body(&mut self, payload_size: PayloadSize) -> Result<Bytes, ParseError> {
        let prealloc = usize::try_from(payload_size.len()).unwrap_or(usize::MAX).min(BODY_PREALLOC_LIMIT);
        let mut body = BytesMut::with_capacity(prealloc);

        loop {
            match self.next_message().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => return Err(ParseError::invalid_body("receive header while reading body")),
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::IncompleteRequest),
            }
        }
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                let error_response = build_error_response(StatusCode::INTERNAL_SERVER_ERROR);
                self.do_send_response(error_response).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let write_timeout = self.write_timeout;
        let write = Self::write_response(&mut self.framed_write, response);

        let result = match write_timeout {
            Some(timeout) => match time::timeout(timeout, write).await {
                Ok(result) => result,
                Err(_elapsed) => Err(SendError::io(io::Error::new(ErrorKind::TimedOut, "write timed out"))),
            },
            None => write.await,
        };

        result.map_err(Into::into)
    }

    async fn write_response<T>(framed_write: &mut FramedWrite<W, ResponseEncoder>, response: Response<T>) -> Result<(), SendError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();

        let payload_size = {
            let size_hint = body.size_hint();
            match size_hint.exact() {
                Some(0) => PayloadSize::Empty,
                Some(length) => PayloadSize::Length(length),
                None => return Err(SendError::invalid_body("streaming response bodies are not supported")),
            }
        };

        let head = ResponseHead::from_parts(header_parts, ());
        framed_write.feed(Message::<_, Bytes>::Header((head, payload_size))).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let payload_item =
                        frame.into_data().map(PayloadItem::Chunk).map_err(|_e| SendError::invalid_body("resolve body response error"))?;

                    framed_write.feed(Message::Payload(payload_item)).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}"))),
                None => {
                    framed_write.feed(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
                    SinkExt::<Message<(ResponseHead, PayloadSize), Bytes>>::flush(framed_write).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Gracefully shuts the write side down. Error paths skip this and rely
    /// on the socket closing when the connection is dropped.
    async fn shutdown(&mut self) {
        if let Err(e) = self.framed_write.get_mut().shutdown().await {
            warn!("write side shutdown failed, cause {}", e);
        }
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = status_code;
    response
}
