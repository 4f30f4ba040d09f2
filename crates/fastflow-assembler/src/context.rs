//! Assembly context
//!
//! Everything that used to live in ambient process environment is handed
//! in here explicitly, which keeps `assemble` pure and testable. The
//! optional identifiers are caller-owned shared resources; the assembler
//! reads them, it never creates or mutates them.

#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub account_id: String,
    pub region: String,
    /// Project name, prefixed onto every physical resource name.
    pub project: String,
    /// ARN of the shared upstream stream feeding the ingestion tier.
    pub upstream_stream_arn: Option<String>,
    /// ARN of the shared secret.
    pub secret_arn: Option<String>,
    /// Security group attached to VPC-enabled compute units.
    pub security_group_id: Option<String>,
    /// Endpoint of the shared cache cluster.
    pub cache_endpoint: Option<String>,
}

impl AssemblyContext {
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            project: project.into(),
            upstream_stream_arn: None,
            secret_arn: None,
            security_group_id: None,
            cache_endpoint: None,
        }
    }

    pub fn with_upstream_stream(mut self, arn: impl Into<String>) -> Self {
        self.upstream_stream_arn = Some(arn.into());
        self
    }

    pub fn with_secret(mut self, arn: impl Into<String>) -> Self {
        self.secret_arn = Some(arn.into());
        self
    }

    pub fn with_security_group(mut self, id: impl Into<String>) -> Self {
        self.security_group_id = Some(id.into());
        self
    }

    pub fn with_cache_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.cache_endpoint = Some(endpoint.into());
        self
    }
}
