use http::StatusCode;

use crate::discovery::ExtractError;
use crate::util::BoxError;

/// Error returned by [`Subscriber`](crate::Subscriber) operations.
///
/// `E` is the error type of the underlying HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// Hub discovery failed, or the hub could not be reached.
    #[error("hub not found")]
    HubNotFound(#[source] HubNotFound<E>),
    /// A subscription request was attempted with no known topic URL.
    #[error("topic URL is unknown; call `discover` first or specify the topic explicitly")]
    TopicNotFound,
    /// The hub refused the subscription request.
    #[error(transparent)]
    Subscription(SubscriptionError),
}

/// Detail of [`Error::HubNotFound`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HubNotFound<E> {
    #[error("invalid request URI")]
    Uri(#[source] http::Error),
    #[error("failed to form-encode the subscription request")]
    Encode(#[source] serde_urlencoded::ser::Error),
    #[error("HTTP request failed")]
    Http(#[source] E),
    #[error("HTTP request timed out")]
    Timeout,
    #[error("failed to read response body")]
    Body(#[source] BoxError),
    #[error("resource returned HTTP status code {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Extract(ExtractError),
}

/// The hub did not accept a subscription request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SubscriptionError {
    /// The hub returned a client or server error status.
    #[error("hub returned HTTP status code {status}: {message}")]
    Rejected { status: StatusCode, message: String },
    /// The hub returned a status other than `202 Accepted`.
    #[error("hub must return `202 Accepted` for a pending subscription request, got {0}")]
    NotAccepted(StatusCode),
}

impl<E> From<HubNotFound<E>> for Error<E> {
    fn from(e: HubNotFound<E>) -> Self {
        Error::HubNotFound(e)
    }
}

impl<E> From<SubscriptionError> for Error<E> {
    fn from(e: SubscriptionError) -> Self {
        Error::Subscription(e)
    }
}
