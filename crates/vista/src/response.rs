//! Writing rendered views to HTTP responses.

use std::io;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response};

use crate::error::ViewError;

/// Content type set on rendered responses that don't have one yet.
pub const TEXT_HTML: &str = "text/html";

/// An outgoing response the service can write a rendered view to.
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends `bytes` to the response body.
    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl ResponseWriter for Response<Vec<u8>> {
    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }

    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.body_mut().extend_from_slice(bytes);
        Ok(())
    }
}

impl ResponseWriter for Response<String> {
    fn headers(&self) -> &HeaderMap {
        Response::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }

    fn write_body(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.body_mut().push_str(text);
        Ok(())
    }
}

/// Writes `body`, then sets `Content-Type: text/html` if absent.
///
/// A failed write leaves the headers untouched.
pub fn write_html<W: ResponseWriter + ?Sized>(
    response: &mut W,
    body: &[u8],
) -> Result<(), ViewError> {
    response.write_body(body).map_err(ViewError::Write)?;
    if !response.headers().contains_key(CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
    }
    Ok(())
}
