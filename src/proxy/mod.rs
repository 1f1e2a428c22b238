// Proxy module - Pingora ProxyHttp implementation
// Every request is answered in request_filter; nothing is proxied upstream.

pub mod helpers;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, GatewayResponse, RequestBody};
use crate::pipeline::RequestContext;

use self::helpers::{client_identifier, extract_headers, extract_query_params, peer_ip};

/// ImgateProxy implements the Pingora ProxyHttp trait
/// Turns sessions into gateway requests and writes the gateway's responses
pub struct ImgateProxy {
    gateway: Arc<Gateway>,
    client_ip_header: String,
}

impl ImgateProxy {
    /// Create a new ImgateProxy from configuration
    pub fn new(config: &Config) -> std::result::Result<Self, String> {
        let gateway = Gateway::from_config(config)?;
        Ok(Self::with_gateway(
            Arc::new(gateway),
            config.rate_limit.client_ip_header.clone(),
        ))
    }

    pub fn with_gateway(gateway: Arc<Gateway>, client_ip_header: String) -> Self {
        Self {
            gateway,
            client_ip_header,
        }
    }

    async fn write_response(session: &mut Session, response: GatewayResponse) -> Result<()> {
        let mut header = ResponseHeader::build(response.status, Some(response.headers.len() + 1))?;
        for (name, value) in response.headers {
            header.insert_header(name, value)?;
        }
        header.insert_header("Content-Length", response.body.len().to_string())?;

        session
            .write_response_header(Box::new(header), false)
            .await?;
        session
            .write_response_body(Some(response.body), true)
            .await?;
        Ok(())
    }
}

/// Upload body read from the downstream session on demand
struct SessionBody<'a> {
    session: &'a mut Session,
}

#[async_trait]
impl RequestBody for SessionBody<'_> {
    /// The returned buffer is at most `limit + chunk` long, which is enough
    /// for the gateway to answer 413 without buffering the rest.
    async fn read_body(&mut self, limit: usize) -> std::result::Result<Option<Bytes>, GatewayError> {
        let mut buffer = BytesMut::new();
        let mut received = false;

        while let Some(chunk) = self
            .session
            .read_request_body()
            .await
            .map_err(|e| GatewayError::Processing(format!("failed to read request body: {e}")))?
        {
            received = true;
            buffer.extend_from_slice(&chunk);
            if buffer.len() > limit {
                tracing::debug!(
                    size = buffer.len(),
                    limit = limit,
                    "Upload exceeds limit, stopped reading body"
                );
                break;
            }
        }

        Ok(received.then(|| buffer.freeze()))
    }
}

#[async_trait]
impl ProxyHttp for ImgateProxy {
    type CTX = RequestContext;

    /// Create a new request context for each incoming request
    fn new_ctx(&self) -> Self::CTX {
        RequestContext::empty()
    }

    /// Never reached: request_filter always answers
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        tracing::error!(
            request_id = %ctx.request_id(),
            "upstream_peer called for a request the gateway did not answer"
        );
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "imgate has no upstream",
        ))
    }

    /// Build the gateway request, run it, and write the response
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let method = req.method.as_str().to_string();
        let path = req.uri.path().to_string();
        let query = extract_query_params(req);
        let headers = extract_headers(req);

        let client_id = client_identifier(&headers, &self.client_ip_header, peer_ip(session));

        ctx.set_request_line(method.clone(), path.clone());
        ctx.set_client_id(client_id.clone());

        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %method,
            path = %path,
            client_id = ?client_id,
            "Request received"
        );

        let request = GatewayRequest {
            method,
            path,
            query,
            headers,
            client_id,
            body: None,
        };

        let response = self
            .gateway
            .handle_with_body(ctx, request, &mut SessionBody { session: &mut *session })
            .await;
        Self::write_response(session, response).await?;

        Ok(true)
    }
}
