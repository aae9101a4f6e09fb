//! Personal information detection.

use crate::domain::models::{BatchSize, ExecutionConfig, Parallelism};
use crate::infrastructure::detectors::{PatternDetector, SecretsDetector, PII_CATEGORIES, SECRETS};
use crate::services::CompositeSignal;

pub const PII_SIGNAL: &str = "pii";

/// Documents per local batch
pub const PII_LOCAL_BATCH_SIZE: usize = 128;

/// The `pii` signal: regex PII categories plus embedded secrets.
///
/// Each Item maps every category (`credit_card`, `crypto_address`,
/// `email_address`, `bank_number`, `ip_address`, `phone_number`, `secrets`)
/// to its spans. Offloading sends the whole composite to the `pii` operation.
pub fn pii() -> CompositeSignal {
    CompositeSignal::new(PII_SIGNAL, PII_CATEGORIES.into_iter().chain([SECRETS]))
        .with_detector(Box::new(PatternDetector::new()))
        .with_detector(Box::new(SecretsDetector::new()))
        .with_execution(ExecutionConfig::new(
            BatchSize::fixed(PII_LOCAL_BATCH_SIZE),
            Parallelism::Max,
        ))
        .with_remote_operation(PII_SIGNAL)
}
