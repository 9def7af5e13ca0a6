macro_rules! serde_delegate {
    (visit_bytes) => {
        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            std::str::from_utf8(v).map_err(E::custom).and_then(|s| self.visit_str(s))
        }
    };
}

pub mod consts {
    use http::header::HeaderValue;

    // <https://github.com/rust-lang/rust-clippy/issues/5812>
    #[allow(clippy::declare_interior_mutable_const)]
    pub const APPLICATION_WWW_FORM_URLENCODED: HeaderValue =
        HeaderValue::from_static("application/x-www-form-urlencoded");
    pub const REL_HUB: &str = "hub";
    pub const REL_SELF: &str = "self";
}

pub mod http_service;

mod collect_body;

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use http::header::{HeaderMap, CONTENT_TYPE};
use mime::Mime;
use serde::de;

pub use self::collect_body::CollectBody;
pub use self::http_service::HttpService;

/// Type-erased error, as accepted by `hyper` for body errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Parses the `Content-Type` header of a message, if any.
pub fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

pub fn deserialize_from_str<'de, T, D>(d: D) -> Result<T, D::Error>
where
    T: FromStr,
    D: de::Deserializer<'de>,
{
    struct Visitor<T>(PhantomData<T>);

    impl<'de, T> de::Visitor<'de> for Visitor<T>
    where
        T: FromStr,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(std::any::type_name::<T>())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        serde_delegate!(visit_bytes);
    }

    d.deserialize_str(Visitor::<T>(PhantomData))
}
