use sha2::Digest;

use crate::models::{AllocationDecision, AllocationType, ModelVersion};

/// Number of traffic buckets; one bucket per percentage point
pub const TRAFFIC_BUCKETS: u32 = 100;

/// Deterministic traffic bucket in [0, 100) for a user id
///
/// The digest of the raw id is read as a big-endian unsigned integer and
/// reduced modulo 100. Generic over the hash so the algorithm can be swapped
/// without touching allocation logic.
pub fn traffic_bucket<D: Digest>(user_id: &str) -> u8 {
    let digest = D::digest(user_id.as_bytes());
    digest
        .iter()
        .fold(0u32, |acc, byte| (acc * 256 + *byte as u32) % TRAFFIC_BUCKETS) as u8
}

/// Sort experiments into the fixed order used for cumulative traffic ranges:
/// oldest first, ties broken by id.
pub fn order_experiments(experiments: &mut [ModelVersion]) {
    experiments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Pick the model version that serves `user_id`
///
/// * No active version: the configured fallback label.
/// * Active version, no experiments: control.
/// * Otherwise the user's bucket is located within the cumulative traffic
///   ranges of the experiments (in [`order_experiments`] order); a bucket past
///   every range goes to control.
///
/// Pure function of its inputs: the same configuration and user id always
/// produce the same decision.
pub fn select_allocation<D: Digest>(
    active: Option<&ModelVersion>,
    experiments: &[ModelVersion],
    user_id: &str,
    fallback_version: &str,
) -> AllocationDecision {
    let Some(active) = active else {
        return AllocationDecision {
            version_id: None,
            version: fallback_version.to_string(),
            allocation_type: AllocationType::Fallback,
            is_fallback: true,
            bucket: None,
        };
    };

    let control = |bucket: Option<u8>| AllocationDecision {
        version_id: Some(active.id),
        version: active.version.clone(),
        allocation_type: AllocationType::Control,
        is_fallback: false,
        bucket,
    };

    if experiments.is_empty() {
        return control(None);
    }

    let mut ordered = experiments.to_vec();
    order_experiments(&mut ordered);

    let bucket = traffic_bucket::<D>(user_id);
    let position = bucket as f64;
    let mut cumulative = 0.0;

    for experiment in &ordered {
        let traffic = experiment.traffic_percentage().max(0.0);
        if position >= cumulative && position < cumulative + traffic {
            return AllocationDecision {
                version_id: Some(experiment.id),
                version: experiment.version.clone(),
                allocation_type: AllocationType::Experiment,
                is_fallback: false,
                bucket: Some(bucket),
            };
        }
        cumulative += traffic;
    }

    control(Some(bucket))
}
