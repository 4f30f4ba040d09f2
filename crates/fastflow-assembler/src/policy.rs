//! Policy synthesizer
//!
//! Computes the minimal permission document for a compute unit from the
//! capability grants collected while wiring it. Synthesis is pure: same
//! grants, same identifiers, same document.

use fastflow_cloud::{PolicyDocument, PolicyStatement};

const LOG_ACTIONS: &[&str] = &[
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

const VPC_ACTIONS: &[&str] = &[
    "ec2:CreateNetworkInterface",
    "ec2:DescribeNetworkInterfaces",
    "ec2:DeleteNetworkInterface",
    "ec2:AssignPrivateIpAddresses",
    "ec2:UnassignPrivateIpAddresses",
];

const S3_WRITE_ACTIONS: &[&str] = &[
    "s3:AbortMultipartUpload",
    "s3:GetBucketLocation",
    "s3:GetObject",
    "s3:ListBucket",
    "s3:ListBucketMultipartUploads",
    "s3:PutObject",
];

const STREAM_READ_ACTIONS: &[&str] = &[
    "kinesis:ListShards",
    "kinesis:GetRecords",
    "kinesis:DescribeStream",
    "kinesis:GetShardIterator",
    "kinesis:DescribeStreamSummary",
    "kinesis:ListStreams",
    "kinesis:SubscribeToShard",
];

const QUEUE_CONSUME_ACTIONS: &[&str] = &[
    "sqs:ReceiveMessage",
    "sqs:DeleteMessage",
    "sqs:GetQueueAttributes",
    "sqs:GetQueueUrl",
    "sqs:ChangeMessageVisibility",
];

/// A request for a specific action set against specific resolved
/// resources. Only ever used as synthesizer input, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityGrant {
    /// Write access into the upstream stream. The assembler only ever
    /// consumes the stream; this grant is for callers synthesizing
    /// producer-side roles.
    PublishToStream(Vec<String>),
    PublishToQueue(Vec<String>),
    PublishToTopic(Vec<String>),
    ReadSecret(Vec<String>),
    WriteDeliveryTarget(Vec<String>),
    /// Queue consumption including visibility management.
    ConsumeQueue(Vec<String>),
    /// Shard iteration over the upstream stream.
    ConsumeStream(Vec<String>),
}

impl CapabilityGrant {
    fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::PublishToStream(_) => &["kinesis:PutRecord", "kinesis:PutRecords"],
            Self::PublishToQueue(_) => &["sqs:SendMessage"],
            Self::PublishToTopic(_) => &["sns:Publish"],
            Self::ReadSecret(_) => &["secretsmanager:GetSecretValue"],
            Self::WriteDeliveryTarget(_) => &["firehose:PutRecord", "firehose:PutRecordBatch"],
            Self::ConsumeQueue(_) => QUEUE_CONSUME_ACTIONS,
            Self::ConsumeStream(_) => STREAM_READ_ACTIONS,
        }
    }

    fn resources(&self) -> &[String] {
        match self {
            Self::PublishToStream(r)
            | Self::PublishToQueue(r)
            | Self::PublishToTopic(r)
            | Self::ReadSecret(r)
            | Self::WriteDeliveryTarget(r)
            | Self::ConsumeQueue(r)
            | Self::ConsumeStream(r) => r,
        }
    }
}

/// Build the permission document for one compute unit.
///
/// One statement per distinct action-set/resource-set pair; a grant with
/// an empty resource set emits nothing. The baseline statement (log
/// write, plus network-interface lifecycle when the unit has VPC access)
/// is the only one allowed a wildcard resource scope.
pub fn synthesize_policy(grants: &[CapabilityGrant], vpc_access: bool) -> PolicyDocument {
    let mut baseline: Vec<&str> = LOG_ACTIONS.to_vec();
    if vpc_access {
        baseline.extend_from_slice(VPC_ACTIONS);
    }
    let mut statements = vec![PolicyStatement::allow(baseline, ["*"])];

    for grant in grants {
        let mut resources: Vec<String> = Vec::new();
        for resource in grant.resources() {
            if !resources.contains(resource) {
                resources.push(resource.clone());
            }
        }
        if resources.is_empty() {
            continue;
        }
        let statement = PolicyStatement::allow(grant.actions().iter().copied(), resources);
        if !statements.contains(&statement) {
            statements.push(statement);
        }
    }

    PolicyDocument::new(statements)
}

/// Service role policy for the delivery target itself: write access to
/// the destination bucket, log write, and read access to the upstream
/// stream when the target is stream-sourced.
pub fn delivery_role_policy(bucket_arn: &str, source_stream_arn: Option<&str>) -> PolicyDocument {
    let mut statements = vec![
        PolicyStatement::allow(
            S3_WRITE_ACTIONS.iter().copied(),
            [bucket_arn.to_string(), format!("{bucket_arn}/*")],
        ),
        PolicyStatement::allow(LOG_ACTIONS.iter().copied(), ["*"]),
    ];
    if let Some(stream_arn) = source_stream_arn {
        statements.push(PolicyStatement::allow(
            STREAM_READ_ACTIONS[..4].iter().copied(),
            [stream_arn],
        ));
    }
    PolicyDocument::new(statements)
}
