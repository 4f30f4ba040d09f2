//! Provisioner trait and the deterministic planning backend

use crate::error::{ProvisionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kinds of resources the assembler may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Caller-owned upstream stream; referenced by triggers, never
    /// created by the assembler.
    Stream,
    Queue,
    DeadLetterQueue,
    Topic,
    Subscription,
    DeliveryStream,
    Function,
    Role,
    EventSourceMapping,
    ScheduleRule,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stream => "stream",
            Self::Queue => "queue",
            Self::DeadLetterQueue => "dead-letter-queue",
            Self::Topic => "topic",
            Self::Subscription => "subscription",
            Self::DeliveryStream => "delivery-stream",
            Self::Function => "function",
            Self::Role => "role",
            Self::EventSourceMapping => "event-source-mapping",
            Self::ScheduleRule => "schedule-rule",
        };
        write!(f, "{s}")
    }
}

/// A creation request handed to the backend. `config` is opaque to the
/// assembler's callers; each backend reads the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub kind: ResourceKind,
    pub name: String,
    pub config: serde_json::Value,
}

impl ResourceRequest {
    pub fn new(kind: ResourceKind, name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            kind,
            name: name.into(),
            config,
        }
    }

    /// Full resource key (kind:name).
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

/// Identifiers returned by a backend for one created resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIds {
    pub name: String,
    pub arn: String,
    /// Present for resources addressed by URL (queues).
    pub url: Option<String>,
}

/// Record of one provisioned resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResource {
    pub kind: ResourceKind,
    pub ids: ResourceIds,
    pub created_at: DateTime<Utc>,
}

/// The single operation the assembler needs from a backend: create a
/// resource, return its identifiers. Synchronous by design; the assembler
/// is a one-shot planner, not a runtime service.
pub trait Provisioner {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Create the requested resource and return its identifiers. Must
    /// fail on a duplicate (kind, name) request rather than return the
    /// existing resource.
    fn create(&mut self, request: &ResourceRequest) -> Result<ResourceIds>;
}

/// Deterministic backend that mints well-formed identifiers from
/// (account, region, kind, name) without touching any API. Given the same
/// request sequence it always produces the same identifiers, which is what
/// makes `assemble` reproducible end to end.
#[derive(Debug, Clone)]
pub struct PlanningProvisioner {
    account_id: String,
    region: String,
    seen: HashSet<(ResourceKind, String)>,
    created: Vec<CreatedResource>,
    requests: Vec<ResourceRequest>,
}

impl PlanningProvisioner {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            seen: HashSet::new(),
            created: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Every resource created so far, in request order.
    pub fn created(&self) -> &[CreatedResource] {
        &self.created
    }

    /// The raw requests received, in order, configs included.
    pub fn requests(&self) -> &[ResourceRequest] {
        &self.requests
    }

    fn mint(&self, kind: ResourceKind, name: &str) -> ResourceIds {
        let account = &self.account_id;
        let region = &self.region;
        let arn = match kind {
            ResourceKind::Stream => {
                format!("arn:aws:kinesis:{region}:{account}:stream/{name}")
            }
            ResourceKind::Queue | ResourceKind::DeadLetterQueue => {
                format!("arn:aws:sqs:{region}:{account}:{name}")
            }
            ResourceKind::Topic | ResourceKind::Subscription => {
                format!("arn:aws:sns:{region}:{account}:{name}")
            }
            ResourceKind::DeliveryStream => {
                format!("arn:aws:firehose:{region}:{account}:deliverystream/{name}")
            }
            ResourceKind::Function => {
                format!("arn:aws:lambda:{region}:{account}:function:{name}")
            }
            ResourceKind::Role => format!("arn:aws:iam::{account}:role/{name}"),
            ResourceKind::EventSourceMapping => {
                format!("arn:aws:lambda:{region}:{account}:event-source-mapping:{name}")
            }
            ResourceKind::ScheduleRule => {
                format!("arn:aws:events:{region}:{account}:rule/{name}")
            }
        };
        let url = match kind {
            ResourceKind::Queue | ResourceKind::DeadLetterQueue => Some(format!(
                "https://sqs.{region}.amazonaws.com/{account}/{name}"
            )),
            _ => None,
        };
        ResourceIds {
            name: name.to_string(),
            arn,
            url,
        }
    }
}

impl Provisioner for PlanningProvisioner {
    fn name(&self) -> &str {
        "planning"
    }

    fn create(&mut self, request: &ResourceRequest) -> Result<ResourceIds> {
        let key = (request.kind, request.name.clone());
        if !self.seen.insert(key) {
            return Err(ProvisionError::ResourceAlreadyExists(request.key()));
        }

        let ids = self.mint(request.kind, &request.name);
        tracing::debug!(kind = %request.kind, name = %request.name, arn = %ids.arn, "planned resource");
        self.created.push(CreatedResource {
            kind: request.kind,
            ids: ids.clone(),
            created_at: Utc::now(),
        });
        self.requests.push(request.clone());
        Ok(ids)
    }
}
