//! Blocking REST client for the futures API.
//!
//! Runs only on executor worker threads, never on the event loop. Transport
//! failures are reported as a negative status so callers branch on one
//! integer the way they branch on HTTP codes.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::constants::{
    RECV_WINDOW_MS, REST_BASE_URL, REST_CONNECT_TIMEOUT_MS, REST_TOTAL_TIMEOUT_MS,
};
use crate::core::clock;
use crate::rest::signer::{signed_query, Params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Status code plus accumulated body. `status < 0` is a transport failure
/// (DNS, TCP, TLS, timeout); the body then carries the error text.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: i32,
    pub body: String,
}

impl RestResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub struct RestClient {
    http: reqwest::blocking::Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl RestClient {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, api_secret, REST_BASE_URL)
    }

    /// Tests point this at a local server.
    pub fn with_base_url(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_millis(REST_CONNECT_TIMEOUT_MS))
            .timeout(Duration::from_millis(REST_TOTAL_TIMEOUT_MS))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("rest: cannot build HTTP client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: base_url.into(),
        })
    }

    /// Perform one request. Signed requests get `timestamp` and
    /// `recvWindow` appended and a `signature` over the raw query; every
    /// request carries `X-MBX-APIKEY`.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        signed: bool,
    ) -> RestResponse {
        let mut params = params.clone();
        if signed {
            params.add("timestamp", clock::now_ms());
            params.add("recvWindow", RECV_WINDOW_MS);
        }

        let query = if signed {
            signed_query(&params, &self.api_secret)
        } else {
            params.encoded_query()
        };

        let url = format!("{}{}", self.base_url, path);
        let builder = match method {
            // POST carries the parameters as a form body.
            Method::Post => self
                .http
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Content-Length", query.len())
                .body(query),
            // Everything else carries them in the URL.
            Method::Get => self.http.get(with_query(&url, &query)),
            Method::Put => self.http.put(with_query(&url, &query)),
            Method::Delete => self.http.delete(with_query(&url, &query)),
        };

        let result = builder.header("X-MBX-APIKEY", &self.api_key).send();

        match result {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().unwrap_or_default();
                debug!("rest: {:?} {} -> {}", method, path, status);
                RestResponse { status, body }
            }
            Err(e) => {
                warn!("rest: {:?} {} transport failure: {}", method, path, e);
                RestResponse {
                    status: -1,
                    body: e.to_string(),
                }
            }
        }
    }
}

fn with_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else {
        format!("{}?{}", url, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_appends_only_when_present() {
        assert_eq!(with_query("https://x/y", ""), "https://x/y");
        assert_eq!(with_query("https://x/y", "a=1"), "https://x/y?a=1");
    }

    #[test]
    fn transport_failure_is_negative_status() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let client =
            RestClient::with_base_url("k", "s", "http://192.0.2.1:9").unwrap();
        let resp = client.request(Method::Get, "/fapi/v1/time", &Params::new(), false);
        assert!(resp.status < 0);
        assert!(!resp.is_ok());
    }
}
