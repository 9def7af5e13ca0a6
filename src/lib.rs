//! A WebSub subscriber.
//!
//! [`Subscriber::discover`] finds the hub and topic URLs advertised by a resource, and
//! [`Subscriber::subscribe`] and [`Subscriber::unsubscribe`] send subscription requests to a
//! hub. The [`callback`] module helps answering the hub's verification of intent.
//!
//! <https://www.w3.org/TR/websub/#subscriber>

#![forbid(unsafe_code)]

pub mod callback;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod subscriber;

mod util;

pub use crate::discovery::Discovery;
pub use crate::error::{Error, HubNotFound, SubscriptionError};
pub use crate::hub::{Mode, Options};
pub use crate::subscriber::Subscriber;
pub use crate::util::HttpService;
