use std::time::Duration;

use http::header::HeaderMap;
use http::{Request, Response, Uri};
use parking_lot::Mutex;
use tower::ServiceExt;

use crate::discovery::{self, Discovery};
use crate::error::{Error, HubNotFound, SubscriptionError};
use crate::hub::{self, Intent, Mode, Options, Reply};
use crate::util::{CollectBody, HttpService};

/// A WebSub subscriber.
///
/// The subscriber remembers the topic URL found by the last successful [`discover`] call and
/// uses it for subscription requests that don't specify a topic explicitly. When calls run
/// concurrently on the same `Subscriber`, the last discovery to complete wins, so prefer
/// passing [`Options::topic`] in that case.
///
/// [`discover`]: Subscriber::discover
pub struct Subscriber<S> {
    client: S,
    topic: Mutex<Option<String>>,
    timeout: Option<Duration>,
}

impl<S> Subscriber<S> {
    pub fn new(client: S) -> Self {
        Subscriber {
            client,
            topic: Mutex::new(None),
            timeout: None,
        }
    }

    /// Sets a deadline for each HTTP request. Elapsing it is reported as
    /// [`HubNotFound::Timeout`].
    ///
    /// This requires the Tokio timer to be available.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the topic URL found by the last successful discovery, if any.
    pub fn topic(&self) -> Option<String> {
        self.topic.lock().clone()
    }

    /// Replaces the remembered topic URL, returning the previous one.
    pub fn set_topic(&self, topic: impl Into<String>) -> Option<String> {
        self.topic.lock().replace(topic.into())
    }

    /// Discovers the hub and topic URLs of the resource at `resource_url`.
    ///
    /// `headers` are the only headers sent with the request. On success, the topic URL is
    /// remembered for subsequent subscription requests.
    pub async fn discover<B>(
        &self,
        resource_url: &str,
        headers: HeaderMap,
    ) -> Result<Discovery, Error<S::Error>>
    where
        S: HttpService<B> + Clone,
        B: From<Vec<u8>>,
    {
        log::trace!("Subscriber::discover; resource_url={}", resource_url);

        let req = discovery::request(resource_url, headers).map_err(HubNotFound::Uri)?;
        let res = self.send(req).await?;

        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            log::debug!("Resource {} returned HTTP status code {}", resource_url, status);
            return Err(HubNotFound::Status(status).into());
        }

        let (parts, body) = res.into_parts();
        let body = CollectBody::new(body).await.map_err(HubNotFound::Body)?;
        let discovery = discovery::extract(resource_url, &parts.headers, &body)
            .map_err(HubNotFound::Extract)?;

        *self.topic.lock() = Some(discovery.topic.clone());

        Ok(discovery)
    }

    /// Requests the hub at `hub` to start sending updates of the topic to `callback`.
    pub async fn subscribe<B>(
        &self,
        hub: &str,
        callback: &Uri,
        options: Options,
    ) -> Result<(), Error<S::Error>>
    where
        S: HttpService<B> + Clone,
        B: From<Vec<u8>>,
    {
        self.subscription_request(Mode::Subscribe, hub, callback, options)
            .await
    }

    /// Requests the hub at `hub` to stop sending updates of the topic to `callback`.
    pub async fn unsubscribe<B>(
        &self,
        hub: &str,
        callback: &Uri,
        options: Options,
    ) -> Result<(), Error<S::Error>>
    where
        S: HttpService<B> + Clone,
        B: From<Vec<u8>>,
    {
        self.subscription_request(Mode::Unsubscribe, hub, callback, options)
            .await
    }

    /// Sends a subscription request and checks that the hub accepted it.
    ///
    /// A successful return only means that the hub has received the request. The subscription
    /// becomes effective after the hub verifies the intent at `callback`
    /// (see [`callback::verify_intent`](crate::callback::verify_intent)).
    pub async fn subscription_request<B>(
        &self,
        mode: Mode,
        hub: &str,
        callback: &Uri,
        mut options: Options,
    ) -> Result<(), Error<S::Error>>
    where
        S: HttpService<B> + Clone,
        B: From<Vec<u8>>,
    {
        let topic = if let Some(topic) = options.topic.take().or_else(|| self.topic()) {
            topic
        } else {
            return Err(Error::TopicNotFound);
        };

        let intent = Intent::new(mode, hub.to_owned(), callback.clone(), topic, options);
        log::info!("Sending {} request for topic {} to hub {}", mode, intent.topic, hub);

        let req = intent.request::<B, S::Error>()?;
        let res = self.send(req).await?;

        let status = res.status();
        match hub::classify(status, res.headers()) {
            Reply::Accepted => {
                log::debug!("Hub {} accepted the request ({})", hub, intent.topic);
                Ok(())
            }
            Reply::NotAccepted => {
                log::warn!(
                    "Topic {} at hub {} returned HTTP status code {}",
                    intent.topic,
                    hub,
                    status
                );
                Err(SubscriptionError::NotAccepted(status).into())
            }
            Reply::Rejected { plain_text } => {
                let body = if plain_text {
                    Some(
                        CollectBody::new(res.into_body())
                            .await
                            .map_err(HubNotFound::Body)?,
                    )
                } else {
                    None
                };
                let err = hub::rejection(status, body.as_deref());
                log::warn!("Topic {} at hub {}: {}", intent.topic, hub, err);
                Err(err.into())
            }
        }
    }

    async fn send<B>(
        &self,
        req: Request<B>,
    ) -> Result<Response<S::ResponseBody>, HubNotFound<S::Error>>
    where
        S: HttpService<B> + Clone,
    {
        let call = self.client.clone().into_service().oneshot(req);
        let res = if let Some(timeout) = self.timeout {
            tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| HubNotFound::Timeout)?
        } else {
            call.await
        };
        res.map_err(HubNotFound::Http)
    }
}
