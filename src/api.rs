use std::{fmt, io::Read, str::FromStr};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, PercentEncode, utf8_percent_encode};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, DeserializeOwned},
};

use crate::Profile;

pub mod datasource;
mod error;
pub mod folder;
mod paginate;
pub mod query;
pub mod team_group;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::*;
pub use paginate::*;

/// JSON fields that a typed record does not name. They are kept in the order
/// the server sent them and written back out unchanged, numbers included, so
/// that a record can be fetched, modified, and sent back without losing
/// anything.
pub type Unknown = serde_json::Map<String, serde_json::Value>;

/// An error encountered while building a request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid request: {0}")]
    Http(#[from] http::Error),
    #[error("Failed to serialize query string: {0}")]
    Query(#[from] serde_qs::Error),
    #[error("Failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),
}

/// Implemented by types that can be sent as requests to the Grafana API.
pub trait ApiRequest: Sized {
    /// The corresponding response type.
    type Response: ApiResponse;

    /// The path that the request should take, relative to the base URL.
    fn path(&self) -> String;

    /// The method to use.
    fn method(&self) -> http::Method {
        http::Method::GET
    }

    /// The serializable request body.
    fn body(&self) -> Option<impl Serialize> {
        None::<&()>
    }

    /// The serializable query string.
    fn query(&self) -> Option<impl Serialize> {
        None::<&()>
    }

    /// Consume the request and return an [http::Request] suitable for passing
    /// to your favorite HTTP client.
    fn into_request(self, profile: &Profile) -> Result<http::Request<String>, RequestError> {
        let query = match self.query() {
            Some(qs) => Some(serde_qs::to_string(&qs)?),
            None => None,
        };

        let body = match self.body() {
            Some(body) => Some(serde_json::to_string(&body)?),
            None => None,
        };

        build_request(
            profile,
            self.method(),
            &self.path(),
            query.as_deref(),
            body,
        )
    }

    /// Request one page of a listing.
    fn paginate(self, page: usize, limit: usize) -> PaginatedRequest<Self> {
        PaginatedRequest {
            base: self,
            page,
            limit,
        }
    }
}

/// Build a request against the profile's base URL, with the standard headers
/// attached. The query string and body must already be serialized.
pub(crate) fn build_request(
    profile: &Profile,
    method: http::Method,
    path: &str,
    query: Option<&str>,
    body: Option<String>,
) -> Result<http::Request<String>, RequestError> {
    // Keep any sub-path the instance is served under, e.g. /grafana.
    let base = profile.url.path().trim_end_matches('/');
    let mut path_and_query = format!("{base}{path}");
    if let Some(qs) = query.filter(|qs| !qs.is_empty()) {
        path_and_query.push('?');
        path_and_query.push_str(qs);
    }

    let mut parts = profile.url.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().map_err(http::Error::from)?);
    let uri = http::Uri::from_parts(parts).map_err(http::Error::from)?;

    tracing::debug!(%method, %uri, "building request");

    let mut req = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(
            http::header::AUTHORIZATION,
            profile.credential.header_value(),
        )
        .header(http::header::USER_AGENT, &profile.user_agent)
        .header(http::header::ACCEPT, "application/json");

    if let Some(org_id) = profile.org_id {
        req = req.header("X-Grafana-Org-Id", org_id);
    }

    let req = if let Some(body) = body {
        req.header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::CONTENT_LENGTH, body.len())
            .body(body)
    } else {
        req.body(String::new())
    };

    Ok(req?)
}

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a caller-supplied value for use as a single path segment.
pub(crate) fn segment(s: &str) -> PercentEncode<'_> {
    utf8_percent_encode(s, PATH_SEGMENT)
}

pub(crate) fn is_zero(v: &i64) -> bool {
    *v == 0
}

pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}

/// Decode an integer field on a record that also collects [`Unknown`] fields.
///
/// Such records are buffered before their fields are decoded. Since numbers
/// keep their original text, a buffered number may only be readable as a
/// [`serde_json::Number`], not as a machine integer.
pub(crate) fn int<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_number(serde_json::Number::deserialize(de)?)
}

/// Like [`int`], for optional fields.
pub(crate) fn opt_int<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    Option::<serde_json::Number>::deserialize(de)?
        .map(parse_number)
        .transpose()
}

fn parse_number<T, E>(n: serde_json::Number) -> Result<T, E>
where
    T: FromStr,
    T::Err: fmt::Display,
    E: de::Error,
{
    let text = n.to_string();
    text.parse()
        .map_err(|e| E::custom(format_args!("invalid integer {text}: {e}")))
}

/// Implemented by types that can be read as responses from the Grafana API.
pub trait ApiResponse: Sized {
    /// Read the response from an [http::Response] object.
    fn from_response(resp: http::Response<impl Read>) -> Result<Self, ApiError> {
        let (parts, body) = resp.into_parts();
        Self::from_response_parts(parts, body)
    }

    /// Read the response from pre-parsed parts. Useful for async HTTP clients
    /// where the body must be collected before parsing.
    fn from_response_parts(parts: http::response::Parts, body: impl Read)
    -> Result<Self, ApiError>;
}

/// A private trait for types that deserialize directly from a successful
/// response body.
pub(crate) trait DataResponse: DeserializeOwned {}

impl<T: DataResponse> DataResponse for Vec<T> {}

impl<T: DataResponse> ApiResponse for T {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        read_json(&parts, body)
    }
}

// For API methods where only success matters. Grafana usually sends a
// {"message": ...} body, which is discarded.
impl ApiResponse for () {
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        let bytes = read_body(body)?;
        if !parts.status.is_success() {
            return Err(ApiError::from_status(parts.status, &bytes));
        }

        Ok(())
    }
}

pub(crate) fn read_body(mut body: impl Read) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();
    body.read_to_end(&mut buf).map_err(ApiError::Body)?;
    Ok(buf)
}

/// Decode a JSON response body, or build an error from a non-2xx status.
pub(crate) fn read_json<T: DeserializeOwned>(
    parts: &http::response::Parts,
    body: impl Read,
) -> Result<T, ApiError> {
    let bytes = read_body(body)?;
    if !parts.status.is_success() {
        return Err(ApiError::from_status(parts.status, &bytes));
    }

    decode_json(parts.status, &bytes)
}

/// Decode a JSON body regardless of status.
pub(crate) fn decode_json<T: DeserializeOwned>(
    status: http::StatusCode,
    bytes: &[u8],
) -> Result<T, ApiError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de).map_err(|e| {
        tracing::error!("Failed to parse API response: {e:#?}");
        ApiError::InvalidResponse { status, source: e }
    })
}
