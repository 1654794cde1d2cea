//! HTTP header decoder implementation for parsing HTTP request heads
//!
//! This module provides a restartable, incremental parser that turns a byte
//! stream into a structured request head (method, URI, version, header
//! fields). Input may arrive in arbitrarily small chunks: a request line or
//! header line split across reads parses exactly the same as one delivered
//! whole, because the decoder accumulates the current line in a scratch
//! buffer that survives across `decode` calls.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header section size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1 request lines are accepted
//!
//! # State machine
//!
//! The decoder moves `RequestLine` -> `Headers`; each CRLF-terminated line
//! advances it. The empty line terminating the header block makes the
//! decoder emit `(RequestHeader, PayloadSize)` - that emission is the
//! headers-complete transition, and it happens exactly once per request.
//! After emitting, the decoder is back in its initial state, ready for the
//! next request on a persistent connection.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
///
/// One instance serves a whole connection: it restarts itself after every
/// emitted head, and [`HeaderDecoder::reset`] discards partial state without
/// releasing the scratch buffer's capacity.
pub struct HeaderDecoder {
    state: HeadState,
    /// Partial-line accumulator, reused across requests
    line: Vec<u8>,
    request_line: Option<RequestLine>,
    headers: HeaderMap,
    /// Bytes consumed for the current head, also the limit counter
    head_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadState {
    /// Expecting the request line
    RequestLine,
    /// Expecting header lines or the terminating empty line
    Headers,
}

struct RequestLine {
    method: Method,
    uri: Uri,
    version: Version,
}

impl HeaderDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restores the initial state for reuse on the next request.
    ///
    /// Backing buffers keep their capacity.
    pub fn reset(&mut self) {
        self.state = HeadState::RequestLine;
        self.line.clear();
        self.request_line = None;
        self.headers.clear();
        self.head_bytes = 0;
    }

    /// True when some bytes of a request head have been consumed but the
    /// head has not been emitted yet. Distinguishes a mid-request EOF from
    /// a clean close.
    pub(crate) fn is_partial(&self) -> bool {
        self.head_bytes > 0
    }

    /// Moves bytes from `src` into the line accumulator, enforcing the
    /// header section size limit.
    fn take_bytes(&mut self, src: &mut BytesMut, count: usize) -> Result<(), ParseError> {
        self.head_bytes += count;
        ensure!(self.head_bytes <= MAX_HEADER_BYTES, ParseError::too_large_header(self.head_bytes, MAX_HEADER_BYTES));
        self.line.extend_from_slice(&src.split_to(count));
        Ok(())
    }

    /// Fills the line accumulator until a LF is consumed.
    ///
    /// Returns false when `src` ran out before the line was complete.
    fn fill_line(&mut self, src: &mut BytesMut) -> Result<bool, ParseError> {
        match src.iter().position(|b| *b == b'\n') {
            Some(idx) => {
                self.take_bytes(src, idx + 1)?;
                Ok(true)
            }
            None => {
                let len = src.len();
                self.take_bytes(src, len)?;
                Ok(false)
            }
        }
    }

    /// Builds the request head once the terminating empty line is consumed.
    fn finish(&mut self) -> Result<(RequestHeader, PayloadSize), ParseError> {
        let Some(request_line) = self.request_line.take() else {
            return Err(ParseError::invalid_request_line("header block without request line"));
        };

        let mut request = Request::new(());
        *request.method_mut() = request_line.method;
        *request.uri_mut() = request_line.uri;
        *request.version_mut() = request_line.version;
        *request.headers_mut() = std::mem::take(&mut self.headers);

        let header = RequestHeader::from(request);
        let payload_size = parse_payload(&header)?;

        trace!(head_size = self.head_bytes, ?payload_size, "parsed request head");

        self.state = HeadState::RequestLine;
        self.head_bytes = 0;

        Ok((header, payload_size))
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self {
            state: HeadState::RequestLine,
            line: Vec::new(),
            request_line: None,
            headers: HeaderMap::new(),
            head_bytes: 0,
        }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a request head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((header, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if the input violates the request grammar; the
    ///   error is not recoverable and the connection must be torn down
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if !self.fill_line(src)? {
                return Ok(None);
            }

            // a full line, LF included, now sits in the accumulator
            ensure!(
                self.line.len() >= 2 && self.line[self.line.len() - 2] == b'\r',
                ParseError::invalid_header("line not terminated by CRLF")
            );
            let content_len = self.line.len() - 2;

            match self.state {
                HeadState::RequestLine => {
                    let request_line = parse_request_line(&self.line[..content_len])?;
                    self.request_line = Some(request_line);
                    self.state = HeadState::Headers;
                    self.line.clear();
                }
                HeadState::Headers => {
                    if content_len == 0 {
                        self.line.clear();
                        return Ok(Some(self.finish()?));
                    }

                    ensure!(self.headers.len() < MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
                    let (name, value) = parse_header_line(&self.line[..content_len])?;
                    self.headers.append(name, value);
                    self.line.clear();
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        // decode drains src entirely, so leftover state is all that matters
        if self.is_partial() {
            return Err(ParseError::IncompleteRequest);
        }
        Ok(None)
    }
}

/// Parses `METHOD SP request-target SP HTTP-version`.
fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    ensure!(
        line.iter().all(|b| (0x20..0x7f).contains(b)),
        ParseError::invalid_request_line("control byte in request line")
    );
    // all visible ascii at this point
    let Ok(line) = std::str::from_utf8(line) else {
        return Err(ParseError::invalid_request_line("request line is not ascii"));
    };

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::invalid_request_line(line));
    };

    let method = parse_method(method)?;

    ensure!(!target.is_empty(), ParseError::InvalidUri);
    let uri = target.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

    let version = match version {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        other => return Err(ParseError::invalid_version(other)),
    };

    Ok(RequestLine { method, uri, version })
}

/// Validates the method token against the methods this server dispatches.
fn parse_method(token: &str) -> Result<Method, ParseError> {
    match token {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(ParseError::InvalidMethod),
    }
}

/// Parses `name ":" OWS value OWS`.
///
/// Whitespace between the field name and the colon is rejected, per
/// RFC 9112 section 5.1.
fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue), ParseError> {
    let colon = line
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| ParseError::invalid_header("missing ':' separator"))?;

    let name = &line[..colon];
    ensure!(!name.is_empty(), ParseError::invalid_header("empty header name"));
    ensure!(
        !name.iter().any(|b| *b == b' ' || *b == b'\t'),
        ParseError::invalid_header("whitespace before ':'")
    );
    let name = HeaderName::from_bytes(name).map_err(|e| ParseError::invalid_header(e.to_string()))?;

    let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
        .map_err(|e| ParseError::invalid_header(e.to_string()))?;

    Ok((name, value))
}

/// Determines the request body framing from the parsed head.
///
/// `Content-Length` yields a fixed-size payload. `Transfer-Encoding` is not
/// supported: chunked request bodies are rejected up front so the connection
/// never desynchronizes on framing this server cannot read.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(_), _) => Err(ParseError::UnsupportedTransferEncoding),

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            if length == 0 {
                Ok(PayloadSize::Empty)
            } else {
                Ok(PayloadSize::Length(length))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_bytes())
    }

    #[test]
    fn from_curl() {
        let mut buf = crlf(indoc! {"
            GET /index.html HTTP/1.1
            Host: 127.0.0.1:8080
            User-Agent: curl/7.79.1
            Accept: */*

        "});

        let (header, payload_size) = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);

        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(http::header::HOST), Some(&HeaderValue::from_static("127.0.0.1:8080")));
        assert_eq!(header.headers().get(http::header::USER_AGENT), Some(&HeaderValue::from_static("curl/7.79.1")));
        assert_eq!(header.headers().get(http::header::ACCEPT), Some(&HeaderValue::from_static("*/*")));

        assert!(buf.is_empty());
    }

    #[test]
    fn leftover_bytes_stay_in_buffer() {
        let mut buf = crlf("POST /submit HTTP/1.1\nContent-Length: 3\n\n123");

        let (header, payload_size) = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&buf[..], b"123");
    }

    #[test]
    fn query_survives_parsing() {
        let mut buf = crlf("GET /index/?a=1&b=2&a=3 HTTP/1.1\nHost: localhost\n\n");

        let (header, _) = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.uri().path(), "/index/");
        assert_eq!(header.uri().query(), Some("a=1&b=2&a=3"));
    }

    #[test]
    fn byte_at_a_time_equals_single_feed() {
        let text = crlf("GET /users/42 HTTP/1.1\nHost: localhost\nAccept: */*\n\n");

        let single = {
            let mut buf = text.clone();
            HeaderDecoder::new().decode(&mut buf).unwrap().unwrap()
        };

        let mut decoder = HeaderDecoder::new();
        let mut buf = BytesMut::new();
        let mut dribbled = None;
        for byte in &text[..] {
            buf.extend_from_slice(&[*byte]);
            if let Some(item) = decoder.decode(&mut buf).unwrap() {
                dribbled = Some(item);
            }
        }

        let dribbled = dribbled.expect("head must complete on the last byte");
        assert_eq!(dribbled.0.method(), single.0.method());
        assert_eq!(dribbled.0.uri(), single.0.uri());
        assert_eq!(dribbled.0.version(), single.0.version());
        assert_eq!(dribbled.0.headers(), single.0.headers());
        assert_eq!(dribbled.1, single.1);
    }

    #[test]
    fn reset_recovers_from_partial_input() {
        let mut decoder = HeaderDecoder::new();

        let mut partial = BytesMut::from(&b"GARBAGE /nowhere HT"[..]);
        assert!(decoder.decode(&mut partial).unwrap().is_none());
        assert!(decoder.is_partial());

        decoder.reset();
        assert!(!decoder.is_partial());

        let mut buf = crlf("GET /fresh HTTP/1.1\n\n");
        let (header, _) = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(header.uri().path(), "/fresh");
    }

    #[test]
    fn decoder_restarts_after_each_head() {
        let mut decoder = HeaderDecoder::new();

        let mut buf = crlf("GET /first HTTP/1.1\n\nDELETE /second HTTP/1.1\n\n");

        let (first, _) = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.method(), &Method::GET);
        assert_eq!(first.uri().path(), "/first");

        let (second, _) = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.method(), &Method::DELETE);
        assert_eq!(second.uri().path(), "/second");
    }

    #[test]
    fn clean_eof_is_not_an_error() {
        let mut decoder = HeaderDecoder::new();
        let mut buf = BytesMut::new();

        assert!(decoder.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_mid_request_is_incomplete() {
        let mut decoder = HeaderDecoder::new();
        let mut buf = BytesMut::from(&b"GET /half HTT"[..]);

        let err = decoder.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::IncompleteRequest));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut buf = crlf("BREW /coffee HTTP/1.1\n\n");
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidMethod));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut buf = crlf("GET / HTTP/2.0\n\n");
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidVersion(_)));
    }

    #[test]
    fn bare_lf_is_rejected() {
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\nHost: localhost\n\n"[..]);
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn whitespace_before_colon_is_rejected() {
        let mut buf = crlf("GET / HTTP/1.1\nHost : localhost\n\n");
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn oversized_head_is_rejected_even_without_newline() {
        let mut decoder = HeaderDecoder::new();
        let mut buf = BytesMut::from(vec![b'a'; MAX_HEADER_BYTES + 1].as_slice());

        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::TooLargeHeader { .. }));
    }

    #[test]
    fn header_count_limit_is_enforced() {
        let mut text = String::from("GET / HTTP/1.1\n");
        for i in 0..MAX_HEADER_NUM + 1 {
            text.push_str(&format!("x-h{i}: {i}\n"));
        }
        text.push('\n');

        let err = HeaderDecoder::new().decode(&mut crlf(&text)).unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders { .. }));
    }

    #[test]
    fn chunked_transfer_encoding_is_rejected() {
        let mut buf = crlf("POST /upload HTTP/1.1\nTransfer-Encoding: chunked\n\n");
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedTransferEncoding));
    }

    #[test]
    fn invalid_content_length_is_rejected() {
        let mut buf = crlf("POST /upload HTTP/1.1\nContent-Length: banana\n\n");
        let err = HeaderDecoder::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));
    }
}
