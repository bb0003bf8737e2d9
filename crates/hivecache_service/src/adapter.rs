// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;
use hivecache::{Error, get_group};
use tracing::{Level, event};

use crate::codec::{DEFAULT_BASE_PATH, encode_response, parse_path};

/// Dispatches peer-facing cache requests against the group registry.
///
/// This is the request-handling body of a peer server: give it the path of
/// an incoming request and it parses out the group and key, runs the
/// group's lookup pipeline, and frames the response. The embedder maps the
/// error cases onto its transport — [`Error::GroupNotFound`] is a "not
/// found", [`Error::BadPath`] and [`Error::EmptyKey`] are "bad request",
/// anything else is an internal failure.
///
/// # Examples
///
/// ```
/// use hivecache::{BoxError, LoaderFn, new_group};
/// use hivecache_service::{ServiceAdapter, decode_response};
///
/// # futures::executor::block_on(async {
/// new_group(
///     "inventory",
///     1024,
///     LoaderFn::new(|key: String| async move { Ok::<_, BoxError>(key.into_bytes()) }),
/// );
///
/// let adapter = ServiceAdapter::new();
/// let frame = adapter.serve("/api/cache/inventory/widget-7").await?;
/// assert_eq!(&decode_response(&frame)?[..], b"widget-7");
/// # Ok::<(), hivecache::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ServiceAdapter {
    base_path: String,
}

impl Default for ServiceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceAdapter {
    /// Creates an adapter rooted at [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_path(DEFAULT_BASE_PATH)
    }

    /// Creates an adapter rooted at a custom base path.
    #[must_use]
    pub fn with_base_path(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The path prefix this adapter serves.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Serves one request path, returning the framed response value.
    ///
    /// # Errors
    ///
    /// [`Error::BadPath`] for unparsable paths, [`Error::GroupNotFound`]
    /// for unknown groups, and whatever the group's own lookup surfaces.
    pub async fn serve(&self, path: &str) -> Result<Bytes, Error> {
        let (group_name, key) = parse_path(&self.base_path, path)?;
        event!(Level::DEBUG, group = %group_name, key = %key, "serving peer request");

        let group = get_group(&group_name).ok_or_else(|| Error::GroupNotFound(group_name.clone()))?;
        let view = group.get(&key).await?;
        Ok(encode_response(view.as_bytes()))
    }
}
