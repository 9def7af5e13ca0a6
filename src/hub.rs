//! Subscription requests sent to a hub.
//!
//! <https://www.w3.org/TR/websub/#subscriber-sends-subscription-request>

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroU64;

use http::header::{HeaderMap, CONTENT_TYPE};
use http::uri::{Parts, PathAndQuery};
use http::{Request, StatusCode, Uri};
use serde::Serialize;

use crate::error::{HubNotFound, SubscriptionError};
use crate::util;
use crate::util::consts::APPLICATION_WWW_FORM_URLENCODED;

/// `hub.mode` of a subscription request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Subscribe,
    Unsubscribe,
}

/// Optional parameters of a subscription request.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Topic URL to (un)subscribe. Defaults to the one found by the last
    /// [`discover`](crate::Subscriber::discover) call.
    pub topic: Option<String>,
    /// `hub.lease_seconds`, sent only if set.
    pub lease_seconds: Option<NonZeroU64>,
    /// `hub.secret`, sent only if set.
    pub secret: Option<String>,
    /// Additional query parameters appended to the hub URL.
    pub query: Vec<(String, String)>,
    /// Additional request headers. These replace the default ones of the same name.
    pub headers: HeaderMap,
}

/// A subscription request ready to be sent to a hub.
#[derive(Clone, Debug)]
pub struct Intent {
    pub mode: Mode,
    pub hub: String,
    pub callback: Uri,
    pub topic: String,
    pub lease_seconds: Option<NonZeroU64>,
    pub secret: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
}

/// Form-encoded body of a subscription request.
#[derive(Debug, Serialize)]
pub struct Form<'a> {
    #[serde(rename = "hub.callback")]
    #[serde(with = "http_serde::uri")]
    pub callback: &'a Uri,
    #[serde(rename = "hub.mode")]
    pub mode: Mode,
    #[serde(rename = "hub.topic")]
    pub topic: &'a str,
    #[serde(rename = "hub.lease_seconds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_seconds: Option<NonZeroU64>,
    #[serde(rename = "hub.secret")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<&'a str>,
}

/// How a hub answered a subscription request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    /// `202 Accepted`: the hub will verify the intent of the subscriber.
    Accepted,
    /// Error status. The body is the reason if `plain_text` is `true`.
    Rejected { plain_text: bool },
    /// Any other status.
    NotAccepted,
}

const REJECTED: &str = "hub rejected the request";

impl Intent {
    pub fn new(mode: Mode, hub: String, callback: Uri, topic: String, options: Options) -> Self {
        Intent {
            mode,
            hub,
            callback,
            topic,
            lease_seconds: options.lease_seconds,
            secret: options.secret,
            query: options.query,
            headers: options.headers,
        }
    }

    pub fn form(&self) -> Form<'_> {
        Form {
            callback: &self.callback,
            mode: self.mode,
            topic: &self.topic,
            lease_seconds: self.lease_seconds,
            secret: self.secret.as_deref(),
        }
    }

    /// Builds the `POST` request to the hub.
    pub(crate) fn request<B, E>(&self) -> Result<Request<B>, HubNotFound<E>>
    where
        B: From<Vec<u8>>,
    {
        let uri = self.uri()?;
        let body = serde_urlencoded::to_string(self.form()).map_err(HubNotFound::Encode)?;

        let mut req = Request::post(uri)
            .header(CONTENT_TYPE, APPLICATION_WWW_FORM_URLENCODED)
            .body(B::from(body.into_bytes()))
            .map_err(HubNotFound::Uri)?;
        req.headers_mut().extend(self.headers.clone());

        Ok(req)
    }

    /// The hub URL with the fragment removed and the extra query parameters appended to its
    /// query.
    fn uri<E>(&self) -> Result<Uri, HubNotFound<E>> {
        let hub = self.hub.split('#').next().unwrap_or_default();
        let uri = hub.parse::<Uri>().map_err(|e| HubNotFound::Uri(http::Error::from(e)))?;
        if self.query.is_empty() {
            return Ok(uri);
        }

        let query = serde_urlencoded::to_string(&self.query).map_err(HubNotFound::Encode)?;
        let mut parts = Parts::from(uri);
        let path_and_query = match parts.path_and_query {
            Some(ref pq) => match pq.query() {
                Some(q) if !q.is_empty() => format!("{}?{}&{}", pq.path(), q, query),
                _ => format!("{}?{}", pq.path(), query),
            },
            None => format!("/?{}", query),
        };
        let path_and_query = PathAndQuery::try_from(path_and_query)
            .map_err(|e| HubNotFound::Uri(http::Error::from(e)))?;
        parts.path_and_query = Some(path_and_query);

        Uri::from_parts(parts).map_err(|e| HubNotFound::Uri(http::Error::from(e)))
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mode::Subscribe => "subscribe",
            Mode::Unsubscribe => "unsubscribe",
        })
    }
}

pub(crate) fn classify(status: StatusCode, headers: &HeaderMap) -> Reply {
    if status.is_client_error() || status.is_server_error() {
        let plain_text = util::content_type(headers).map_or(false, |m| {
            m.type_() == mime::TEXT && m.subtype() == mime::PLAIN
        });
        Reply::Rejected { plain_text }
    } else if status == StatusCode::ACCEPTED {
        Reply::Accepted
    } else {
        Reply::NotAccepted
    }
}

/// Builds the error for a [`Reply::Rejected`] response, given its body if it was plain text.
pub(crate) fn rejection(status: StatusCode, body: Option<&[u8]>) -> SubscriptionError {
    let message = match body {
        Some(body) => String::from_utf8_lossy(body).into_owned(),
        None => REJECTED.to_owned(),
    };
    SubscriptionError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use http::header::{HeaderValue, AUTHORIZATION};

    use super::*;

    fn intent(options: Options) -> Intent {
        Intent::new(
            Mode::Subscribe,
            "https://hub.example/".to_owned(),
            Uri::from_static("https://cb.example/"),
            "https://pub.example/feed".to_owned(),
            options,
        )
    }

    fn build(intent: &Intent) -> Request<Vec<u8>> {
        intent.request::<_, Infallible>().unwrap()
    }

    fn decode(req: &Request<Vec<u8>>) -> Vec<(String, String)> {
        serde_urlencoded::from_bytes(req.body()).unwrap()
    }

    fn pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    #[test]
    fn minimal_form() {
        let req = build(&intent(Options::default()));
        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri(), "https://hub.example/");
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            std::str::from_utf8(req.body()).unwrap(),
            "hub.callback=https%3A%2F%2Fcb.example%2F&hub.mode=subscribe\
             &hub.topic=https%3A%2F%2Fpub.example%2Ffeed",
        );
    }

    #[test]
    fn optional_fields() {
        let req = build(&intent(Options {
            lease_seconds: NonZeroU64::new(86400),
            secret: Some("s3cr3t".to_owned()),
            ..Options::default()
        }));
        assert_eq!(
            decode(&req),
            pairs(&[
                ("hub.callback", "https://cb.example/"),
                ("hub.mode", "subscribe"),
                ("hub.topic", "https://pub.example/feed"),
                ("hub.lease_seconds", "86400"),
                ("hub.secret", "s3cr3t"),
            ])
        );
    }

    #[test]
    fn unsubscribe_form() {
        let mut intent = intent(Options::default());
        intent.mode = Mode::Unsubscribe;
        assert_eq!(
            decode(&build(&intent)),
            pairs(&[
                ("hub.callback", "https://cb.example/"),
                ("hub.mode", "unsubscribe"),
                ("hub.topic", "https://pub.example/feed"),
            ])
        );
    }

    #[test]
    fn extra_headers_win() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        let req = build(&intent(Options {
            headers,
            ..Options::default()
        }));
        assert_eq!(req.headers().get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(req.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer token");
    }

    #[test]
    fn extra_query() {
        let options = Options {
            query: vec![("key".to_owned(), "a b".to_owned())],
            ..Options::default()
        };
        let req = build(&intent(options.clone()));
        assert_eq!(req.uri(), "https://hub.example/?key=a+b");

        let mut intent = intent(options);
        intent.hub = "https://hub.example/subscribe?v=1".to_owned();
        assert_eq!(build(&intent).uri(), "https://hub.example/subscribe?v=1&key=a+b");
    }

    #[test]
    fn extra_query_with_fragment() {
        let mut intent = intent(Options {
            query: vec![("key".to_owned(), "v".to_owned())],
            ..Options::default()
        });
        intent.hub = "https://hub.example/websub#section".to_owned();
        let req = build(&intent);
        assert_eq!(req.uri(), "https://hub.example/websub?key=v");
        assert_eq!(req.uri().query(), Some("key=v"));

        intent.hub = "https://hub.example/websub?v=1#section?x=y".to_owned();
        assert_eq!(build(&intent).uri().query(), Some("v=1&key=v"));

        intent.hub = "https://hub.example".to_owned();
        assert_eq!(build(&intent).uri(), "https://hub.example/?key=v");
    }

    #[test]
    fn invalid_hub() {
        let mut intent = intent(Options::default());
        intent.hub = "not a uri".to_owned();
        let err = intent.request::<Vec<u8>, Infallible>().unwrap_err();
        assert!(matches!(err, HubNotFound::Uri(_)));
    }

    #[test]
    fn only_202_is_accepted() {
        let headers = HeaderMap::new();
        assert_eq!(classify(StatusCode::ACCEPTED, &headers), Reply::Accepted);
        for status in [
            StatusCode::OK,
            StatusCode::CREATED,
            StatusCode::NO_CONTENT,
            StatusCode::FOUND,
        ] {
            assert_eq!(classify(status, &headers), Reply::NotAccepted);
        }
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(
                classify(status, &headers),
                Reply::Rejected { plain_text: false }
            );
        }
    }

    #[test]
    fn plain_text_rejection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, &headers),
            Reply::Rejected { plain_text: true }
        );

        match rejection(StatusCode::BAD_REQUEST, Some(b"unknown topic")) {
            SubscriptionError::Rejected { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "unknown topic");
            }
            e => panic!("unexpected error: {:?}", e),
        }
        match rejection(StatusCode::BAD_GATEWAY, None) {
            SubscriptionError::Rejected { message, .. } => assert_eq!(message, REJECTED),
            e => panic!("unexpected error: {:?}", e),
        }
    }
}
