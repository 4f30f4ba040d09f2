//! Well-known symbolic environment keys
//!
//! A compute unit declares placeholder environment entries under these
//! keys; the assembler rewrites matching entries with resolved
//! identifiers. Keys that match nothing are passed through untouched so
//! unused placeholders stay forward-compatible.

/// Rewritten with the shared secret's identifier.
pub const SECRET_ACCESS: &str = "SECRET_ACCESS";

/// Rewritten with the delivery stream name once it exists.
pub const DELIVERY_TARGET_ACCESS: &str = "DELIVERY_TARGET_ACCESS";

/// Rewritten with the shared cache endpoint handed in by the caller.
pub const CACHE_HOST: &str = "CACHE_HOST";

/// `alerts` -> `ALERTS_ARN`
pub fn topic_arn_key(topic: &str) -> String {
    format!("{}_ARN", symbol(topic))
}

/// `ingest` -> `INGEST_DLQ_URL`
pub fn dlq_url_key(queue: &str) -> String {
    format!("{}_DLQ_URL", symbol(queue))
}

/// `ingest` -> `INGEST_MAIN_URL`
pub fn main_url_key(queue: &str) -> String {
    format!("{}_MAIN_URL", symbol(queue))
}

fn symbol(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}
