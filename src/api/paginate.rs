use std::{fmt, io::Read};

use serde::{Deserialize, Serialize};

use super::{ApiError, ApiRequest, ApiResponse, read_json};

/// The page size Grafana accepts for folder listings.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// The most pages [paginate] will request before giving up on a server that
/// never returns a short page.
pub const MAX_PAGES: usize = 10_000;

/// A request with a page number and page size attached.
pub struct PaginatedRequest<T> {
    /// The inner request.
    pub base: T,
    /// The page to fetch, starting at 1.
    pub page: usize,
    /// The maximum number of records to request from the server.
    pub limit: usize,
}

#[derive(Serialize)]
struct PaginateQuery<T> {
    #[serde(flatten)]
    inner: T,
    limit: usize,
    page: usize,
}

impl<T> fmt::Debug for PaginatedRequest<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedRequest")
            .field("base", &self.base)
            .field("page", &self.page)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<T: ApiRequest> ApiRequest for PaginatedRequest<T> {
    type Response = T::Response;

    fn path(&self) -> String {
        self.base.path()
    }

    fn method(&self) -> http::Method {
        self.base.method()
    }

    fn body(&self) -> Option<impl Serialize> {
        self.base.body()
    }

    fn query(&self) -> Option<impl Serialize> {
        Some(PaginateQuery {
            inner: self.base.query(),
            limit: self.limit,
            page: self.page,
        })
    }
}

/// One page of results. Listing endpoints return a bare JSON array.
pub struct PaginatedResponse<T> {
    /// One page of results.
    pub page: Vec<T>,
}

impl<T> fmt::Debug for PaginatedResponse<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedResponse")
            .field("page", &self.page)
            .finish()
    }
}

impl<T> ApiResponse for PaginatedResponse<T>
where
    T: for<'de> Deserialize<'de>,
{
    fn from_response_parts(
        parts: http::response::Parts,
        body: impl Read,
    ) -> Result<Self, ApiError> {
        Ok(PaginatedResponse {
            page: read_json(&parts, body)?,
        })
    }
}

struct Paginator<F, E, R, T>
where
    F: FnMut(PaginatedRequest<R>) -> Result<R::Response, E>,
    E: From<ApiError>,
    R: ApiRequest<Response = PaginatedResponse<T>> + Clone,
{
    base_req: R,
    fetch_batch: F,
    batch: <Vec<T> as IntoIterator>::IntoIter,
    page_size: usize,
    next_page: usize,
    done: bool,
}

impl<F, E, R, T> Paginator<F, E, R, T>
where
    F: FnMut(PaginatedRequest<R>) -> Result<R::Response, E>,
    E: From<ApiError>,
    R: ApiRequest<Response = PaginatedResponse<T>> + Clone,
{
    fn fetch_next(&mut self) -> Result<(), E> {
        if self.next_page > MAX_PAGES {
            tracing::warn!(pages = MAX_PAGES, "listing never returned a short page");
            self.done = true;
            return Err(ApiError::TooManyPages(MAX_PAGES).into());
        }

        let page = self.next_page;
        let req = self.base_req.clone().paginate(page, self.page_size);
        let PaginatedResponse { page: items } = match (self.fetch_batch)(req) {
            Ok(v) => v,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        tracing::debug!(page, items = items.len(), "fetched page");

        // A short page, including an empty one, is the last.
        if items.len() < self.page_size {
            self.done = true;
        }

        self.batch = items.into_iter();
        self.next_page += 1;
        Ok(())
    }
}

impl<F, E, R, T> Iterator for Paginator<F, E, R, T>
where
    F: FnMut(PaginatedRequest<R>) -> Result<R::Response, E>,
    E: From<ApiError>,
    R: ApiRequest<Response = PaginatedResponse<T>> + Clone,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.batch.next() {
                return Some(Ok(v));
            }

            if self.done {
                return None;
            }

            if let Err(e) = self.fetch_next() {
                return Some(Err(e));
            }
        }
    }
}

/// Repeatedly make a request, fetching pages of `page_size` records by
/// calling `fetch_batch` until the server returns a short page. Records are
/// yielded in server order.
///
/// The first page is fetched before this returns. A `page_size` of zero is
/// treated as one.
pub fn paginate<F, E, R, T>(
    base_req: R,
    page_size: usize,
    fetch_batch: F,
) -> Result<impl Iterator<Item = Result<T, E>>, E>
where
    F: FnMut(PaginatedRequest<R>) -> Result<R::Response, E>,
    E: From<ApiError>,
    R: ApiRequest<Response = PaginatedResponse<T>> + Clone,
{
    let mut paginator = Paginator {
        base_req,
        fetch_batch,
        batch: Vec::new().into_iter(),
        page_size: page_size.max(1),
        next_page: 1,
        done: false,
    };

    paginator.fetch_next()?;
    Ok(paginator)
}
