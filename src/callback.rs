//! Helpers for the callback endpoint that receives the hub's verification of intent.
//!
//! This crate does not host the endpoint. These functions answer the hub's `GET` request from
//! whatever server the application uses.
//!
//! <https://www.w3.org/TR/websub/#hub-verifies-intent>

use http::{Response, StatusCode, Uri};
use serde::Deserialize;

/// Query parameters of a request sent by a hub to a callback URL.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "hub.mode")]
#[serde(rename_all = "lowercase")]
pub enum Verify {
    Subscribe {
        #[serde(rename = "hub.topic")]
        topic: String,
        #[serde(rename = "hub.challenge")]
        challenge: String,
        #[serde(rename = "hub.lease_seconds")]
        #[serde(deserialize_with = "crate::util::deserialize_from_str")]
        lease_seconds: u64,
    },
    Unsubscribe {
        #[serde(rename = "hub.topic")]
        topic: String,
        #[serde(rename = "hub.challenge")]
        challenge: String,
    },
    /// The hub or the publisher refused the subscription.
    Denied {
        #[serde(rename = "hub.topic")]
        topic: String,
        #[serde(rename = "hub.reason")]
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Verify {
    pub fn from_query(query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(query)
    }

    pub fn topic(&self) -> &str {
        match *self {
            Verify::Subscribe { ref topic, .. }
            | Verify::Unsubscribe { ref topic, .. }
            | Verify::Denied { ref topic, .. } => topic,
        }
    }
}

/// Answers a request sent by a hub to the callback URL `uri`.
///
/// For `subscribe` and `unsubscribe`, the challenge is echoed back if `accept` returns `true`,
/// confirming the intent. Otherwise the hub gets a `404 Not Found`, which it takes as a refusal.
/// A `denied` notification is acknowledged with an empty body.
pub fn verify_intent<B, F>(uri: &Uri, accept: F) -> Response<B>
where
    B: From<Vec<u8>>,
    F: FnOnce(&Verify) -> bool,
{
    let verify = match uri.query().map(Verify::from_query) {
        Some(Ok(verify)) => verify,
        Some(Err(e)) => {
            log::debug!("Callback {}: malformed query: {}", uri.path(), e);
            return status(StatusCode::BAD_REQUEST);
        }
        None => return status(StatusCode::BAD_REQUEST),
    };

    if let Verify::Denied {
        ref topic,
        ref reason,
    } = verify
    {
        log::warn!(
            "Subscription to topic {} was denied: {}",
            topic,
            reason.as_deref().unwrap_or("no reason given")
        );
        return status(StatusCode::OK);
    }

    if !accept(&verify) {
        log::debug!("Callback {}: refusing to verify {}", uri.path(), verify.topic());
        return status(StatusCode::NOT_FOUND);
    }

    match verify {
        Verify::Subscribe {
            topic,
            challenge,
            lease_seconds,
        } => {
            log::info!(
                "Verifying subscription to topic {} for {} seconds",
                topic,
                lease_seconds
            );
            Response::new(B::from(challenge.into_bytes()))
        }
        Verify::Unsubscribe { topic, challenge } => {
            log::info!("Verifying unsubscription from topic {}", topic);
            Response::new(B::from(challenge.into_bytes()))
        }
        Verify::Denied { .. } => status(StatusCode::OK),
    }
}

fn status<B: From<Vec<u8>>>(status: StatusCode) -> Response<B> {
    let mut res = Response::new(B::from(Vec::new()));
    *res.status_mut() = status;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(query: &str) -> Uri {
        format!("https://cb.example/websub?{}", query).parse().unwrap()
    }

    #[test]
    fn parse_subscribe() {
        let verify = Verify::from_query(
            "hub.mode=subscribe&hub.topic=https%3A%2F%2Fpub.example%2Ffeed\
             &hub.challenge=abc&hub.lease_seconds=86400",
        )
        .unwrap();
        assert_eq!(
            verify,
            Verify::Subscribe {
                topic: "https://pub.example/feed".to_owned(),
                challenge: "abc".to_owned(),
                lease_seconds: 86400,
            }
        );
        assert_eq!(verify.topic(), "https://pub.example/feed");
    }

    #[test]
    fn parse_denied() {
        let verify =
            Verify::from_query("hub.mode=denied&hub.topic=t&hub.reason=spam").unwrap();
        assert_eq!(
            verify,
            Verify::Denied {
                topic: "t".to_owned(),
                reason: Some("spam".to_owned()),
            }
        );

        let verify = Verify::from_query("hub.mode=denied&hub.topic=t").unwrap();
        assert_eq!(
            verify,
            Verify::Denied {
                topic: "t".to_owned(),
                reason: None,
            }
        );
    }

    #[test]
    fn echo_challenge() {
        let res: Response<Vec<u8>> = verify_intent(
            &uri("hub.mode=subscribe&hub.topic=t&hub.challenge=xyz&hub.lease_seconds=10"),
            |v| v.topic() == "t",
        );
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"xyz");

        let res: Response<Vec<u8>> = verify_intent(
            &uri("hub.mode=unsubscribe&hub.topic=t&hub.challenge=123&hub.lease_seconds=10"),
            |_| true,
        );
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"123");
    }

    #[test]
    fn refuse() {
        let res: Response<Vec<u8>> = verify_intent(
            &uri("hub.mode=subscribe&hub.topic=t&hub.challenge=xyz&hub.lease_seconds=10"),
            |_| false,
        );
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.body().is_empty());
    }

    #[test]
    fn denied_has_no_challenge() {
        let res: Response<Vec<u8>> = verify_intent(
            &uri("hub.mode=denied&hub.topic=t&hub.reason=nope"),
            |_| panic!("`accept` must not be called for `denied`"),
        );
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
    }

    #[test]
    fn malformed() {
        for query in [
            "hub.mode=subscribe&hub.topic=t&hub.challenge=xyz&hub.lease_seconds=forever",
            "hub.mode=subscribe&hub.topic=t",
            "hub.mode=publish&hub.topic=t",
        ] {
            let res: Response<Vec<u8>> = verify_intent(&uri(query), |_| true);
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", query);
        }

        let res: Response<Vec<u8>> =
            verify_intent(&Uri::from_static("https://cb.example/websub"), |_| true);
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
