//! Lazy pagination over list endpoints.
//!
//! List operations return pages of items plus an `@nextLink` continuation
//! path. [`Pageable`] wraps the continuation protocol in an async stream:
//! nothing is fetched until the stream is polled, and each page is fetched
//! only when the previous one has been consumed.

use crate::client::ConfigClient;
use crate::error::AppConfigResult;
use futures::stream::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use std::marker::PhantomData;

/// One page of results from a list operation.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Continuation path for the next page, or `None` on the last page.
    pub next_link: Option<String>,
}

#[derive(Deserialize)]
struct PageBody<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "@nextLink")]
    next_link: Option<String>,
}

/// A deferred, pageable list request.
///
/// Constructing a `Pageable` performs no I/O. Convert it with
/// [`into_stream`](Self::into_stream) to iterate items across page
/// boundaries, or [`into_pages`](Self::into_pages) to handle pages
/// explicitly.
///
/// ```rust,no_run
/// # use azure_appconfig_core::paging::Pageable;
/// # use futures::stream::TryStreamExt;
/// # async fn example(pageable: Pageable<serde_json::Value>) -> Result<(), Box<dyn std::error::Error>> {
/// let mut items = std::pin::pin!(pageable.into_stream());
/// while let Some(item) = items.try_next().await? {
///     println!("{item}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pageable<T> {
    client: ConfigClient,
    path_and_query: String,
    headers: Vec<(&'static str, String)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Pageable<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a pageable request for a list path. The headers are re-sent
    /// with every page request, so per-request state such as
    /// `Accept-Datetime` applies to the whole listing.
    pub fn new(
        client: ConfigClient,
        path_and_query: impl Into<String>,
        headers: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            client,
            path_and_query: path_and_query.into(),
            headers,
            _marker: PhantomData,
        }
    }

    /// Stream the result pages, following `@nextLink` continuations.
    pub fn into_pages(self) -> impl Stream<Item = AppConfigResult<Page<T>>> + Send {
        let Self {
            client,
            path_and_query,
            headers,
            ..
        } = self;

        futures::stream::try_unfold(Some(path_and_query), move |state| {
            let client = client.clone();
            let headers = headers.clone();
            async move {
                let Some(path) = state else {
                    return Ok(None);
                };
                let response = client.get(&path, &headers).await?;
                let body: PageBody<T> = response.json().await?;
                let next = body.next_link.clone();
                let page = Page {
                    items: body.items,
                    next_link: body.next_link,
                };
                Ok(Some((page, next)))
            }
        })
    }

    /// Stream individual items, transparently crossing page boundaries.
    pub fn into_stream(self) -> impl Stream<Item = AppConfigResult<T>> + Send {
        self.into_pages()
            .map_ok(|page| futures::stream::iter(page.items.into_iter().map(Ok)))
            .try_flatten()
    }
}
