//! Flow assembler state machine
//!
//! Straight-line pipeline over the stages of one assembly, with a single
//! absorbing failed state. No stage is re-entered and nothing is rolled
//! back here; a failed assembly leaves cleanup to the provisioning
//! backend.

use crate::context::AssemblyContext;
use crate::error::{AssembleError, Result};
use crate::policy::{delivery_role_policy, synthesize_policy, CapabilityGrant};
use crate::registry::ResourceRegistry;
use crate::resolver::{resolve_env, EnvBindings};
use crate::topology::ResolvedTopology;
use fastflow_cloud::{Provisioner, ResourceIds, ResourceKind, ResourceRequest};
use fastflow_core::model::{
    ComputeUnitSpec, DeliveryTargetSpec, EnvEntry, ErrorHandlingSpec, FlowKind, FlowSpec,
    IngestionSpec, ProjectSpec, TriggerSpec,
};
use fastflow_core::env_keys;
use serde_json::json;

/// Registry name of the caller-owned upstream stream.
const UPSTREAM_STREAM: &str = "upstream";

const DEFAULT_TIMEOUT_SECONDS: u32 = 60;
const DLQ_MAX_RECEIVE_COUNT: u32 = 10;
const DELIVERY_STREAM_NAME_MAX: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Validating,
    BuildingQueuingTier,
    BuildingFanoutTier,
    BuildingDeliveryTarget,
    BuildingIngestionCompute,
    BuildingDequeuingCompute,
    BuildingErrorCompute,
    Done,
    Failed,
}

impl std::fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::BuildingQueuingTier => "building-queuing-tier",
            Self::BuildingFanoutTier => "building-fanout-tier",
            Self::BuildingDeliveryTarget => "building-delivery-target",
            Self::BuildingIngestionCompute => "building-ingestion-compute",
            Self::BuildingDequeuingCompute => "building-dequeuing-compute",
            Self::BuildingErrorCompute => "building-error-compute",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Assemble one flow against the given backend.
pub fn assemble(
    spec: &FlowSpec,
    ctx: &AssemblyContext,
    backend: &mut dyn Provisioner,
) -> Result<ResolvedTopology> {
    FlowAssembler::new(ctx, backend).assemble(spec)
}

/// Assemble every flow of a project, in declared order, through one
/// backend. Each flow gets its own registry; the shared stream and
/// secret come from the context.
pub fn assemble_project(
    project: &ProjectSpec,
    ctx: &AssemblyContext,
    backend: &mut dyn Provisioner,
) -> Result<Vec<ResolvedTopology>> {
    let mut topologies = Vec::with_capacity(project.flows.len());
    for flow in &project.flows {
        topologies.push(FlowAssembler::new(ctx, backend).assemble(flow)?);
    }
    Ok(topologies)
}

/// Drives one assembly: owns the registry and the stage cursor for the
/// duration of a single `assemble` call.
pub struct FlowAssembler<'a> {
    ctx: &'a AssemblyContext,
    backend: &'a mut dyn Provisioner,
    registry: ResourceRegistry,
    state: AssemblyState,
    function_names: Vec<String>,
}

impl<'a> FlowAssembler<'a> {
    pub fn new(ctx: &'a AssemblyContext, backend: &'a mut dyn Provisioner) -> Self {
        Self {
            ctx,
            backend,
            registry: ResourceRegistry::new(),
            state: AssemblyState::Validating,
            function_names: Vec::new(),
        }
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn assemble(mut self, spec: &FlowSpec) -> Result<ResolvedTopology> {
        tracing::info!(flow = %spec.name, backend = self.backend.name(), "assembling flow");
        match self.run(spec) {
            Ok(topology) => {
                self.state = AssemblyState::Done;
                tracing::info!(
                    flow = %spec.name,
                    resources = self.registry.len(),
                    functions = topology.function_names.len(),
                    "assembly complete"
                );
                Ok(topology)
            }
            Err(err) => {
                self.state = AssemblyState::Failed;
                tracing::error!(flow = %spec.name, error = %err, "assembly failed");
                Err(err)
            }
        }
    }

    fn enter(&mut self, state: AssemblyState) {
        self.state = state;
        tracing::info!(stage = %state, "entering stage");
    }

    fn run(&mut self, spec: &FlowSpec) -> Result<ResolvedTopology> {
        self.enter(AssemblyState::Validating);
        self.validate(spec)?;
        self.seed_shared_resources()?;

        // validate() guarantees these sections exist
        let ingestion = spec
            .ingestion
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("ingestion"))?;
        let delivery = spec
            .delivery
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("delivery"))?;
        let dequeuing = spec
            .dequeuing
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("dequeuing"))?;

        self.enter(AssemblyState::BuildingQueuingTier);
        self.build_queuing_tier(ingestion)?;

        self.enter(AssemblyState::BuildingFanoutTier);
        self.build_fanout_tier(ingestion)?;

        self.enter(AssemblyState::BuildingDeliveryTarget);
        self.build_delivery_target(spec, delivery)?;

        self.enter(AssemblyState::BuildingIngestionCompute);
        self.build_ingestion_compute(ingestion)?;

        self.enter(AssemblyState::BuildingDequeuingCompute);
        for unit in dequeuing {
            self.build_dequeuing_compute(spec, &unit.compute)?;
        }

        self.enter(AssemblyState::BuildingErrorCompute);
        if let Some(error_handling) = &spec.error_handling {
            self.build_error_compute(spec, error_handling)?;
        }

        Ok(self.finish(spec))
    }

    fn validate(&self, spec: &FlowSpec) -> Result<()> {
        let ingestion = spec
            .ingestion
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("ingestion"))?;
        spec.dequeuing
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("dequeuing"))?;
        let delivery = spec
            .delivery
            .as_ref()
            .ok_or(AssembleError::MissingRequiredSection("delivery"))?;

        if ingestion.queues.is_empty() {
            return Err(AssembleError::EmptyRequiredList {
                section: "ingestion",
                element: "queue",
            });
        }
        if ingestion.topics.is_empty() {
            return Err(AssembleError::EmptyRequiredList {
                section: "ingestion",
                element: "topic",
            });
        }
        if delivery.dynamic_partitioning && delivery.transform.is_empty() {
            return Err(AssembleError::DynamicPartitioningMisconfigured {
                flow: spec.name.clone(),
            });
        }
        Ok(())
    }

    /// Caller-owned shared resources are readable through the registry
    /// like anything else, just never created here.
    fn seed_shared_resources(&mut self) -> Result<()> {
        if let Some(arn) = &self.ctx.upstream_stream_arn {
            self.registry.put(
                UPSTREAM_STREAM,
                ResourceKind::Stream,
                ResourceIds {
                    name: UPSTREAM_STREAM.to_string(),
                    arn: arn.clone(),
                    url: None,
                },
            )?;
        }
        Ok(())
    }

    fn build_queuing_tier(&mut self, ingestion: &IngestionSpec) -> Result<()> {
        for queue in &ingestion.queues {
            if self.registry.contains(&queue.name, ResourceKind::Queue) {
                return Err(AssembleError::DuplicateName {
                    kind: ResourceKind::Queue,
                    name: queue.name.clone(),
                });
            }
            let physical = format!("{}-{}", self.ctx.project, queue.name);
            let mut dead_letter_arn = None;

            if queue.has_dead_letter {
                let ids = self.backend.create(&ResourceRequest::new(
                    ResourceKind::DeadLetterQueue,
                    format!("{physical}-dlq"),
                    json!({ "retentionDays": queue.retention_days.unwrap_or(1) }),
                ))?;
                dead_letter_arn = Some(ids.arn.clone());
                self.registry
                    .put(&queue.name, ResourceKind::DeadLetterQueue, ids)?;
            }

            let config = json!({
                "visibilityTimeoutSeconds": if queue.has_dead_letter { 60 } else { 30 },
                "deadLetter": dead_letter_arn.map(|arn| json!({
                    "targetArn": arn,
                    "maxReceiveCount": DLQ_MAX_RECEIVE_COUNT,
                })),
            });
            let ids = self.backend.create(&ResourceRequest::new(
                ResourceKind::Queue,
                format!("{physical}-main"),
                config,
            ))?;
            tracing::info!(queue = %queue.name, arn = %ids.arn, "queue created");
            self.registry.put(&queue.name, ResourceKind::Queue, ids)?;
        }
        Ok(())
    }

    fn build_fanout_tier(&mut self, ingestion: &IngestionSpec) -> Result<()> {
        for topic in &ingestion.topics {
            if self.registry.contains(&topic.name, ResourceKind::Topic) {
                return Err(AssembleError::DuplicateName {
                    kind: ResourceKind::Topic,
                    name: topic.name.clone(),
                });
            }
            let ids = self.backend.create(&ResourceRequest::new(
                ResourceKind::Topic,
                format!("{}-{}", self.ctx.project, topic.name),
                json!({ "fifo": topic.fifo }),
            ))?;
            tracing::info!(topic = %topic.name, arn = %ids.arn, "topic created");
            let topic_arn = ids.arn.clone();
            self.registry.put(&topic.name, ResourceKind::Topic, ids)?;

            for subscription in &topic.subscriptions {
                let queue_arn = self
                    .registry
                    .get(&subscription.queue, ResourceKind::Queue)?
                    .arn
                    .clone();
                self.backend.create(&ResourceRequest::new(
                    ResourceKind::Subscription,
                    format!(
                        "{}-{}-{}",
                        self.ctx.project, topic.name, subscription.queue
                    ),
                    json!({ "topicArn": topic_arn, "queueArn": queue_arn }),
                ))?;
            }
        }
        Ok(())
    }

    fn build_delivery_target(
        &mut self,
        spec: &FlowSpec,
        delivery: &DeliveryTargetSpec,
    ) -> Result<()> {
        let bucket_arn = format!("arn:aws:s3:::{}", delivery.bucket);
        let source_stream_arn = if spec.kind == FlowKind::StreamSourced {
            Some(
                self.registry
                    .get(UPSTREAM_STREAM, ResourceKind::Stream)?
                    .arn
                    .clone(),
            )
        } else {
            None
        };

        let stream_name = delivery_stream_name(&self.ctx.project, &spec.name, &delivery.bucket);
        let policy = delivery_role_policy(&bucket_arn, source_stream_arn.as_deref());
        let role = self.backend.create(&ResourceRequest::new(
            ResourceKind::Role,
            format!("{stream_name}-service-role"),
            json!({ "assumedBy": "firehose.amazonaws.com", "policy": policy }),
        ))?;

        let buffering = delivery.buffering.unwrap_or_default();
        let config = json!({
            "bucketArn": bucket_arn,
            "prefix": delivery.prefix,
            "errorOutputPrefix": delivery.error_output_prefix,
            "bufferingHints": {
                "sizeMbs": buffering.size_mbs,
                "intervalSeconds": buffering.interval_seconds,
            },
            "dynamicPartitioning": delivery.dynamic_partitioning,
            "transform": delivery.transform,
            "roleArn": role.arn,
            "sourceStreamArn": source_stream_arn,
        });
        let ids = self.backend.create(&ResourceRequest::new(
            ResourceKind::DeliveryStream,
            stream_name,
            config,
        ))?;
        tracing::info!(delivery = %ids.name, arn = %ids.arn, "delivery stream created");
        self.registry
            .put(&spec.name, ResourceKind::DeliveryStream, ids)?;
        Ok(())
    }

    fn build_ingestion_compute(&mut self, ingestion: &IngestionSpec) -> Result<()> {
        let unit = &ingestion.compute;
        let mut bindings = EnvBindings::new();

        let mut topic_arns = Vec::new();
        for topic in &ingestion.topics {
            let ids = self.registry.get(&topic.name, ResourceKind::Topic)?;
            bindings.bind(env_keys::topic_arn_key(&topic.name), ids.arn.clone());
            topic_arns.push(ids.arn.clone());
        }

        let mut dead_letter_arns = Vec::new();
        for queue in &ingestion.queues {
            let main = self.registry.get(&queue.name, ResourceKind::Queue)?;
            if let Some(url) = &main.url {
                bindings.bind(env_keys::main_url_key(&queue.name), url.clone());
            }
            if self
                .registry
                .contains(&queue.name, ResourceKind::DeadLetterQueue)
            {
                let dlq = self
                    .registry
                    .get(&queue.name, ResourceKind::DeadLetterQueue)?;
                if let Some(url) = &dlq.url {
                    bindings.bind(env_keys::dlq_url_key(&queue.name), url.clone());
                }
                dead_letter_arns.push(dlq.arn.clone());
            }
        }
        self.bind_shared(&mut bindings);

        let resolved = resolve_env(&unit.env, &bindings);

        let mut grants = Vec::new();
        if unit
            .triggers
            .iter()
            .any(|t| matches!(t, TriggerSpec::Stream { .. }))
        {
            let stream = self.registry.get(UPSTREAM_STREAM, ResourceKind::Stream)?;
            grants.push(CapabilityGrant::ConsumeStream(vec![stream.arn.clone()]));
        }
        grants.push(CapabilityGrant::PublishToTopic(topic_arns));
        grants.push(CapabilityGrant::PublishToQueue(dead_letter_arns));
        if resolved.touched_secret {
            grants.push(CapabilityGrant::ReadSecret(
                self.ctx.secret_arn.iter().cloned().collect(),
            ));
        }

        self.create_compute_unit(unit, resolved.entries, &grants)
    }

    fn build_dequeuing_compute(&mut self, spec: &FlowSpec, unit: &ComputeUnitSpec) -> Result<()> {
        let delivery = self
            .registry
            .get(&spec.name, ResourceKind::DeliveryStream)?
            .clone();

        let mut bindings = EnvBindings::new();
        bindings.bind(env_keys::DELIVERY_TARGET_ACCESS, delivery.name.clone());
        self.bind_shared(&mut bindings);

        // Resolve this unit's own trigger queues up front so a reference
        // to an undeclared queue fails before anything is created.
        let mut consume_arns = Vec::new();
        let mut dead_letter_arns = Vec::new();
        for trigger in &unit.triggers {
            let Some(queue) = trigger.queue_name() else {
                continue;
            };
            let main = self.registry.get(queue, ResourceKind::Queue)?;
            consume_arns.push(main.arn.clone());

            // a trigger queue without a declared dead-letter queue is an
            // empty grant, not an error
            if self.registry.contains(queue, ResourceKind::DeadLetterQueue) {
                let dlq = self.registry.get(queue, ResourceKind::DeadLetterQueue)?;
                if let Some(url) = &dlq.url {
                    bindings.bind(env_keys::dlq_url_key(queue), url.clone());
                }
                dead_letter_arns.push(dlq.arn.clone());
            }
        }

        let resolved = resolve_env(&unit.env, &bindings);

        let mut grants = vec![
            CapabilityGrant::ConsumeQueue(consume_arns),
            CapabilityGrant::PublishToQueue(dead_letter_arns),
        ];
        if resolved.touched_delivery {
            grants.push(CapabilityGrant::WriteDeliveryTarget(vec![delivery.arn]));
        }
        if resolved.touched_secret {
            grants.push(CapabilityGrant::ReadSecret(
                self.ctx.secret_arn.iter().cloned().collect(),
            ));
        }

        self.create_compute_unit(unit, resolved.entries, &grants)
    }

    fn build_error_compute(&mut self, spec: &FlowSpec, error: &ErrorHandlingSpec) -> Result<()> {
        let unit = &error.compute;
        let delivery = self
            .registry
            .get(&spec.name, ResourceKind::DeliveryStream)?
            .clone();

        let mut bindings = EnvBindings::new();
        bindings.bind(env_keys::DELIVERY_TARGET_ACCESS, delivery.name.clone());
        self.bind_shared(&mut bindings);

        // The error unit fans in over every dead-letter queue of the
        // flow, and may re-drive any main queue.
        let dead_letters: Vec<(String, ResourceIds)> = self
            .registry
            .list_by_kind(ResourceKind::DeadLetterQueue)
            .into_iter()
            .map(|(name, ids)| (name.to_string(), ids.clone()))
            .collect();
        let mains: Vec<(String, ResourceIds)> = self
            .registry
            .list_by_kind(ResourceKind::Queue)
            .into_iter()
            .map(|(name, ids)| (name.to_string(), ids.clone()))
            .collect();

        let mut dead_letter_arns = Vec::new();
        for (name, ids) in &dead_letters {
            if let Some(url) = &ids.url {
                bindings.bind(env_keys::dlq_url_key(name), url.clone());
            }
            dead_letter_arns.push(ids.arn.clone());
        }
        let mut main_arns = Vec::new();
        for (name, ids) in &mains {
            if let Some(url) = &ids.url {
                bindings.bind(env_keys::main_url_key(name), url.clone());
            }
            main_arns.push(ids.arn.clone());
        }

        let resolved = resolve_env(&unit.env, &bindings);

        let mut grants = vec![
            CapabilityGrant::ConsumeQueue(dead_letter_arns),
            CapabilityGrant::PublishToQueue(main_arns),
        ];
        if resolved.touched_delivery {
            grants.push(CapabilityGrant::WriteDeliveryTarget(vec![delivery.arn]));
        }
        if resolved.touched_secret {
            grants.push(CapabilityGrant::ReadSecret(
                self.ctx.secret_arn.iter().cloned().collect(),
            ));
        }

        self.create_compute_unit(unit, resolved.entries, &grants)
    }

    fn bind_shared(&self, bindings: &mut EnvBindings) {
        if let Some(secret) = &self.ctx.secret_arn {
            bindings.bind(env_keys::SECRET_ACCESS, secret.clone());
        }
        if let Some(endpoint) = &self.ctx.cache_endpoint {
            bindings.bind(env_keys::CACHE_HOST, endpoint.clone());
        }
    }

    fn create_compute_unit(
        &mut self,
        unit: &ComputeUnitSpec,
        env: Vec<EnvEntry>,
        grants: &[CapabilityGrant],
    ) -> Result<()> {
        let function_name = format!("fn-{}-{}", self.ctx.project, unit.name);

        let policy = synthesize_policy(grants, unit.vpc_access);
        let role = self.backend.create(&ResourceRequest::new(
            ResourceKind::Role,
            format!("{function_name}-access-role"),
            json!({ "assumedBy": "lambda.amazonaws.com", "policy": policy }),
        ))?;
        self.registry
            .put(&unit.name, ResourceKind::Role, role.clone())?;

        let vpc = unit.vpc_access.then(|| {
            json!({ "securityGroupId": self.ctx.security_group_id })
        });
        let config = json!({
            "entry": unit.entry,
            "env": env,
            "timeoutSeconds": unit.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            "roleArn": role.arn,
            "vpc": vpc,
        });
        let ids = self.backend.create(&ResourceRequest::new(
            ResourceKind::Function,
            function_name,
            config,
        ))?;
        tracing::info!(function = %ids.name, "compute unit created");
        self.registry
            .put(&unit.name, ResourceKind::Function, ids.clone())?;
        self.function_names.push(ids.name.clone());

        self.create_triggers(unit, &ids)
    }

    fn create_triggers(&mut self, unit: &ComputeUnitSpec, function: &ResourceIds) -> Result<()> {
        for trigger in &unit.triggers {
            match trigger {
                TriggerSpec::Stream {
                    batch_size,
                    window_seconds,
                } => {
                    let stream_arn = self
                        .registry
                        .get(UPSTREAM_STREAM, ResourceKind::Stream)?
                        .arn
                        .clone();
                    self.backend.create(&ResourceRequest::new(
                        ResourceKind::EventSourceMapping,
                        format!("{}-stream", function.name),
                        json!({
                            "functionArn": function.arn,
                            "eventSourceArn": stream_arn,
                            "batchSize": batch_size,
                            "windowSeconds": window_seconds,
                            "startingPosition": "TRIM_HORIZON",
                        }),
                    ))?;
                }
                TriggerSpec::Queue {
                    queue,
                    batch_size,
                    window_seconds,
                } => {
                    let queue_arn = self.registry.get(queue, ResourceKind::Queue)?.arn.clone();
                    self.backend.create(&ResourceRequest::new(
                        ResourceKind::EventSourceMapping,
                        format!("{}-{}", function.name, queue),
                        json!({
                            "functionArn": function.arn,
                            "eventSourceArn": queue_arn,
                            "batchSize": batch_size,
                            "windowSeconds": window_seconds,
                        }),
                    ))?;
                }
                TriggerSpec::Schedule { cron } => {
                    self.backend.create(&ResourceRequest::new(
                        ResourceKind::ScheduleRule,
                        format!("{}-schedule", function.name),
                        json!({ "cron": cron, "targetArn": function.arn }),
                    ))?;
                }
            }
        }
        Ok(())
    }

    fn finish(&self, spec: &FlowSpec) -> ResolvedTopology {
        let arns_of = |kind: ResourceKind| -> Vec<String> {
            self.registry
                .list_by_kind(kind)
                .into_iter()
                .map(|(_, ids)| ids.arn.clone())
                .collect()
        };

        ResolvedTopology {
            function_names: self.function_names.clone(),
            queue_arns: arns_of(ResourceKind::Queue),
            dead_letter_queue_arns: arns_of(ResourceKind::DeadLetterQueue),
            topic_arns: arns_of(ResourceKind::Topic),
            stream_arns: arns_of(ResourceKind::Stream),
            delivery_stream_arn: self
                .registry
                .get(&spec.name, ResourceKind::DeliveryStream)
                .ok()
                .map(|ids| ids.arn.clone()),
        }
    }
}

fn delivery_stream_name(project: &str, flow: &str, bucket: &str) -> String {
    let mut name = format!("{project}-{flow}-to-{bucket}");
    // names are arbitrary UTF-8; the cut must not split a character
    let mut end = DELIVERY_STREAM_NAME_MAX.min(name.len());
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name.truncate(end);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastflow_cloud::PlanningProvisioner;
    use fastflow_core::load_flow_str;

    fn ctx() -> AssemblyContext {
        AssemblyContext::new("123456789012", "us-east-1", "tele")
            .with_upstream_stream("arn:aws:kinesis:us-east-1:123456789012:stream/device-events")
            .with_secret("arn:aws:secretsmanager:us-east-1:123456789012:secret:shared")
            .with_security_group("sg-0123")
            .with_cache_endpoint("cache.internal:6379")
    }

    fn stream_sourced_flow() -> FlowSpec {
        load_flow_str(
            r#"{
                "name": "fast-path",
                "flowType": 1,
                "delivery": { "bucket": "archive" },
                "ingestion": {
                    "queues": [{ "name": "ingest", "hasDeadLetter": true }],
                    "topics": [
                        { "name": "alerts", "subscriptions": [{ "queue": "ingest" }] }
                    ],
                    "compute": {
                        "name": "queuing",
                        "entry": "fn-kds-queuing",
                        "env": [{ "key": "ALERTS_ARN" }, { "key": "SECRET_ACCESS" }],
                        "triggers": [{ "type": "stream" }]
                    }
                },
                "dequeuing": [
                    {
                        "compute": {
                            "name": "drain",
                            "entry": "fn-sqs-dequeuing",
                            "env": [
                                { "key": "DELIVERY_TARGET_ACCESS" },
                                { "key": "INGEST_DLQ_URL" }
                            ],
                            "triggers": [{ "type": "queue", "queue": "ingest" }]
                        }
                    }
                ],
                "onError": {
                    "compute": {
                        "name": "triage",
                        "entry": "fn-on-error",
                        "env": [
                            { "key": "INGEST_DLQ_URL" },
                            { "key": "INGEST_MAIN_URL" },
                            { "key": "DELIVERY_TARGET_ACCESS" }
                        ]
                    }
                }
            }"#,
        )
        .unwrap()
    }

    fn role_statements(
        backend: &PlanningProvisioner,
        role_name: &str,
    ) -> Vec<serde_json::Value> {
        let request = backend
            .requests()
            .iter()
            .find(|r| r.kind == ResourceKind::Role && r.name == role_name)
            .unwrap_or_else(|| panic!("role {role_name} was never requested"));
        request.config["policy"]["Statement"]
            .as_array()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_stream_sourced_flow_end_to_end() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let topology = assemble(&stream_sourced_flow(), &ctx(), &mut backend).unwrap();

        assert_eq!(
            topology.function_names,
            ["fn-tele-queuing", "fn-tele-drain", "fn-tele-triage"]
        );
        assert_eq!(
            topology.queue_arns,
            ["arn:aws:sqs:us-east-1:123456789012:tele-ingest-main"]
        );
        assert_eq!(
            topology.dead_letter_queue_arns,
            ["arn:aws:sqs:us-east-1:123456789012:tele-ingest-dlq"]
        );
        assert_eq!(
            topology.topic_arns,
            ["arn:aws:sns:us-east-1:123456789012:tele-alerts"]
        );
        assert_eq!(
            topology.stream_arns,
            ["arn:aws:kinesis:us-east-1:123456789012:stream/device-events"]
        );
        assert_eq!(
            topology.delivery_stream_arn.as_deref(),
            Some("arn:aws:firehose:us-east-1:123456789012:deliverystream/tele-fast-path-to-archive")
        );
    }

    #[test]
    fn test_subscription_bound_to_resolved_queue() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&stream_sourced_flow(), &ctx(), &mut backend).unwrap();

        let subscription = backend
            .requests()
            .iter()
            .find(|r| r.kind == ResourceKind::Subscription)
            .unwrap();
        assert_eq!(
            subscription.config["queueArn"],
            "arn:aws:sqs:us-east-1:123456789012:tele-ingest-main"
        );
        assert_eq!(
            subscription.config["topicArn"],
            "arn:aws:sns:us-east-1:123456789012:tele-alerts"
        );
    }

    #[test]
    fn test_ingestion_env_placeholder_rewritten() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&stream_sourced_flow(), &ctx(), &mut backend).unwrap();

        let function = backend
            .requests()
            .iter()
            .find(|r| r.kind == ResourceKind::Function && r.name == "fn-tele-queuing")
            .unwrap();
        let env = function.config["env"].as_array().unwrap();
        let alerts = env.iter().find(|e| e["key"] == "ALERTS_ARN").unwrap();
        assert_eq!(
            alerts["value"],
            "arn:aws:sns:us-east-1:123456789012:tele-alerts"
        );
        let secret = env.iter().find(|e| e["key"] == "SECRET_ACCESS").unwrap();
        assert_eq!(
            secret["value"],
            "arn:aws:secretsmanager:us-east-1:123456789012:secret:shared"
        );
    }

    #[test]
    fn test_dequeuing_env_gets_dlq_url_and_delivery_name() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&stream_sourced_flow(), &ctx(), &mut backend).unwrap();

        let function = backend
            .requests()
            .iter()
            .find(|r| r.kind == ResourceKind::Function && r.name == "fn-tele-drain")
            .unwrap();
        let env = function.config["env"].as_array().unwrap();
        let dlq = env.iter().find(|e| e["key"] == "INGEST_DLQ_URL").unwrap();
        assert_eq!(
            dlq["value"],
            "https://sqs.us-east-1.amazonaws.com/123456789012/tele-ingest-dlq"
        );
        let delivery = env
            .iter()
            .find(|e| e["key"] == "DELIVERY_TARGET_ACCESS")
            .unwrap();
        assert_eq!(delivery["value"], "tele-fast-path-to-archive");
    }

    #[test]
    fn test_stage_order_of_creation() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&stream_sourced_flow(), &ctx(), &mut backend).unwrap();

        let kinds: Vec<ResourceKind> = backend.requests().iter().map(|r| r.kind).collect();
        let first = |kind: ResourceKind| kinds.iter().position(|k| *k == kind).unwrap();

        // dead-letter queue before its main queue, queues before topics,
        // topics before the delivery stream, delivery before functions
        assert!(first(ResourceKind::DeadLetterQueue) < first(ResourceKind::Queue));
        assert!(first(ResourceKind::Queue) < first(ResourceKind::Topic));
        assert!(first(ResourceKind::Topic) < first(ResourceKind::DeliveryStream));
        assert!(first(ResourceKind::DeliveryStream) < first(ResourceKind::Function));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let spec = stream_sourced_flow();

        let mut first = PlanningProvisioner::new("123456789012", "us-east-1");
        let mut second = PlanningProvisioner::new("123456789012", "us-east-1");
        let a = assemble(&spec, &ctx(), &mut first).unwrap();
        let b = assemble(&spec, &ctx(), &mut second).unwrap();

        assert_eq!(a, b);
        assert_eq!(
            role_statements(&first, "fn-tele-drain-access-role"),
            role_statements(&second, "fn-tele-drain-access-role"),
        );
    }

    #[test]
    fn test_partitioning_without_transform_fails_before_creation() {
        let spec = load_flow_str(
            r#"{
                "name": "bad",
                "flowType": 1,
                "delivery": { "bucket": "archive", "dynamicPartitioning": true },
                "ingestion": {
                    "queues": [{ "name": "q" }],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": []
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::DynamicPartitioningMisconfigured { .. }
        ));
        assert!(backend.created().is_empty());
    }

    #[test]
    fn test_missing_sections_reported_by_name() {
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");

        let spec = load_flow_str(r#"{ "name": "f", "flowType": 0 }"#).unwrap();
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::MissingRequiredSection("ingestion")
        ));

        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 0,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [{ "name": "q" }],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                }
            }"#,
        )
        .unwrap();
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::MissingRequiredSection("dequeuing")
        ));
    }

    #[test]
    fn test_empty_queue_list_rejected() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 0,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": []
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(err, AssembleError::EmptyRequiredList { element: "queue", .. }));
    }

    #[test]
    fn test_empty_topic_list_rejected() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 0,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [{ "name": "q" }],
                    "topics": [],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": []
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(err, AssembleError::EmptyRequiredList { element: "topic", .. }));
    }

    #[test]
    fn test_delivery_stream_name_truncates_on_char_boundary() {
        let flow = format!("{}é", "x".repeat(54));
        // byte 60 falls inside the two-byte character
        let name = delivery_stream_name("tele", &flow, "archive");
        assert_eq!(name, format!("tele-{}", "x".repeat(54)));
        assert!(name.len() <= DELIVERY_STREAM_NAME_MAX);

        let short = delivery_stream_name("tele", "fast", "archive");
        assert_eq!(short, "tele-fast-to-archive");
    }

    #[test]
    fn test_multibyte_flow_name_assembles() {
        let json = format!(
            r#"{{
                "name": "{}é",
                "flowType": 2,
                "delivery": {{ "bucket": "archive" }},
                "ingestion": {{
                    "queues": [{{ "name": "q" }}],
                    "topics": [{{ "name": "t" }}],
                    "compute": {{ "name": "c", "entry": "fn" }}
                }},
                "dequeuing": []
            }}"#,
            "x".repeat(54)
        );
        let spec = load_flow_str(&json).unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let topology = assemble(&spec, &ctx(), &mut backend).unwrap();

        let arn = topology.delivery_stream_arn.unwrap();
        let name = arn.rsplit('/').next().unwrap();
        assert!(name.len() <= DELIVERY_STREAM_NAME_MAX);
        assert!(!name.ends_with('é'));
    }

    #[test]
    fn test_trigger_on_undeclared_queue_is_unresolved() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 1,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [{ "name": "ingest" }],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": [
                    {
                        "compute": {
                            "name": "drain",
                            "entry": "fn",
                            "triggers": [{ "type": "queue", "queue": "ghost" }]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::UnresolvedReference {
                kind: ResourceKind::Queue,
                ..
            }
        ));
        assert!(err.to_string().contains("ghost"));
        // nothing of the failing unit was created
        assert!(
            !backend
                .requests()
                .iter()
                .any(|r| r.name.contains("drain"))
        );
    }

    #[test]
    fn test_queue_without_dlq_yields_empty_grant() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 1,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [{ "name": "plain", "hasDeadLetter": false }],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": [
                    {
                        "compute": {
                            "name": "drain",
                            "entry": "fn",
                            "env": [{ "key": "DELIVERY_TARGET_ACCESS" }],
                            "triggers": [{ "type": "queue", "queue": "plain" }]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&spec, &ctx(), &mut backend).unwrap();

        let statements = role_statements(&backend, "fn-tele-drain-access-role");
        assert!(
            !statements.iter().any(|s| s["Action"]
                .as_array()
                .unwrap()
                .iter()
                .any(|a| a == "sqs:SendMessage")),
            "no dead-letter queue declared, publish grant must be empty"
        );
        // consuming the main queue is still granted
        assert!(statements.iter().any(|s| s["Action"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "sqs:ReceiveMessage")));
    }

    #[test]
    fn test_duplicate_queue_name_rejected() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 1,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [{ "name": "ingest" }, { "name": "ingest" }],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": []
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&spec, &ctx(), &mut backend).unwrap_err();
        assert!(matches!(err, AssembleError::DuplicateName { .. }));
    }

    #[test]
    fn test_stream_sourced_without_context_stream_fails() {
        let ctx = AssemblyContext::new("123456789012", "us-east-1", "tele");
        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        let err = assemble(&stream_sourced_flow(), &ctx, &mut backend).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::UnresolvedReference {
                kind: ResourceKind::Stream,
                ..
            }
        ));
    }

    #[test]
    fn test_error_unit_sees_every_dead_letter_queue() {
        let spec = load_flow_str(
            r#"{
                "name": "f",
                "flowType": 1,
                "delivery": { "bucket": "b" },
                "ingestion": {
                    "queues": [
                        { "name": "alpha", "hasDeadLetter": true },
                        { "name": "beta", "hasDeadLetter": true }
                    ],
                    "topics": [{ "name": "t" }],
                    "compute": { "name": "c", "entry": "fn" }
                },
                "dequeuing": [],
                "onError": {
                    "compute": {
                        "name": "triage",
                        "entry": "fn",
                        "env": [
                            { "key": "ALPHA_DLQ_URL" },
                            { "key": "BETA_DLQ_URL" }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        let mut backend = PlanningProvisioner::new("123456789012", "us-east-1");
        assemble(&spec, &ctx(), &mut backend).unwrap();

        let statements = role_statements(&backend, "fn-tele-triage-access-role");
        let consume = statements
            .iter()
            .find(|s| s["Action"]
                .as_array()
                .unwrap()
                .iter()
                .any(|a| a == "sqs:ReceiveMessage"))
            .unwrap();
        let resources = consume["Resource"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0], "arn:aws:sqs:us-east-1:123456789012:tele-alpha-dlq");
        assert_eq!(resources[1], "arn:aws:sqs:us-east-1:123456789012:tele-beta-dlq");
    }
}
