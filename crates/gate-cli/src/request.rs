//! JSON request fixtures for `tenant-gate resolve`.

use gate_core::RequestContext;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A request as read from disk.
///
/// ```json
/// { "headers": { "Authorization": "Bearer ..." }, "host": "healthcare.ai",
///   "path": "/healthcare/portal", "query": { "t": "medical789hash" },
///   "sourceAddr": "192.0.2.10" }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestFile {
    pub headers: BTreeMap<String, String>,
    pub host: Option<String>,
    pub origin: Option<String>,
    pub path: Option<String>,
    pub query: BTreeMap<String, String>,
    pub source_addr: Option<String>,
    pub user_agent: Option<String>,
    pub correlation_id: Option<String>,
}

impl RequestFile {
    pub fn into_context(self) -> RequestContext {
        let mut builder = RequestContext::builder();
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        for (name, value) in self.query {
            builder = builder.query_param(name, value);
        }
        if let Some(host) = self.host {
            builder = builder.host(host);
        }
        if let Some(origin) = self.origin {
            builder = builder.origin(origin);
        }
        if let Some(path) = self.path {
            builder = builder.path(path);
        }
        if let Some(addr) = self.source_addr {
            builder = builder.source_addr(addr);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(id) = self.correlation_id {
            builder = builder.correlation_id(id);
        }
        builder.build()
    }
}
