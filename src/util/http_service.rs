use std::future::Future;
use std::task::{Context, Poll};

use http::{Request, Response};
use http_body::Body;
use tower_service::Service;

use super::BoxError;

/// An HTTP client (like [`hyper::Client`]) used to reach publishers and hubs.
///
/// This is an alias for [`tower_service::Service`] over `http` types, introduced to reduce the
/// number of type parameters on [`Subscriber`](crate::Subscriber). Any timeout, retry or
/// connection pooling behaviour is the business of the underlying service.
pub trait HttpService<B>: private::Sealed<B> {
    /// Body of the responses given by the service.
    type ResponseBody: Body<Error = Self::BodyError>;
    /// Error of [`Self::ResponseBody`].
    type BodyError: Into<BoxError>;
    type Error;
    type Future: Future<Output = Result<Response<Self::ResponseBody>, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>>;

    fn call(&mut self, request: Request<B>) -> Self::Future;

    fn into_service(self) -> IntoService<Self>
    where
        Self: Sized;
}

#[derive(Clone)]
pub struct IntoService<S>(S);

impl<S, ReqB, ResB> HttpService<ReqB> for S
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + ?Sized,
    ResB: Body,
    ResB::Error: Into<BoxError>,
{
    type ResponseBody = ResB;
    type BodyError = ResB::Error;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Service::poll_ready(self, cx)
    }

    fn call(&mut self, request: Request<ReqB>) -> S::Future {
        Service::call(self, request)
    }

    fn into_service(self) -> IntoService<Self>
    where
        Self: Sized,
    {
        IntoService(self)
    }
}

impl<S, ReqB, ResB> private::Sealed<ReqB> for S
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + ?Sized,
    ResB: Body,
    ResB::Error: Into<BoxError>,
{
}

impl<S, B> Service<Request<B>> for IntoService<S>
where
    S: HttpService<B>,
{
    type Response = Response<S::ResponseBody>;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        HttpService::poll_ready(&mut self.0, cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        HttpService::call(&mut self.0, request)
    }
}

mod private {
    pub trait Sealed<B> {}
}
