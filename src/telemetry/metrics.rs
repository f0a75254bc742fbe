//! Prometheus recorder setup and portal metric definitions

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const AUTHZ_DECISIONS: &str = "portal_authz_decisions_total";
const POLICY_RELOADS: &str = "portal_policy_reloads_total";
const POLICY_RELOAD_DURATION: &str = "portal_policy_reload_duration_seconds";
const TEARDOWNS: &str = "portal_teardowns_total";
const IDENTITY_SYNC_USERS: &str = "portal_identity_sync_users_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    // policy reloads are sub-millisecond on small rule sets
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register descriptions and zero values so HELP/TYPE lines are exported
/// before the first request touches each metric.
pub fn describe_metrics() {
    describe_counter!(AUTHZ_DECISIONS, "Authorization decisions by result");
    describe_counter!(POLICY_RELOADS, "Number of full policy reloads");
    describe_histogram!(
        POLICY_RELOAD_DURATION,
        "Time spent rebuilding the policy index in seconds"
    );
    describe_counter!(TEARDOWNS, "Subject teardown sagas by result");
    describe_counter!(
        IDENTITY_SYNC_USERS,
        "Users mirrored from the identity provider"
    );

    counter!(AUTHZ_DECISIONS, "result" => "allow").absolute(0);
    counter!(AUTHZ_DECISIONS, "result" => "deny").absolute(0);
    counter!(POLICY_RELOADS).absolute(0);
    histogram!(POLICY_RELOAD_DURATION).record(0.0);
    counter!(TEARDOWNS, "result" => "success").absolute(0);
    counter!(TEARDOWNS, "result" => "failure").absolute(0);
    counter!(IDENTITY_SYNC_USERS).absolute(0);
}

pub fn record_authz_decision(allowed: bool) {
    let result = if allowed { "allow" } else { "deny" };
    counter!(AUTHZ_DECISIONS, "result" => result).increment(1);
}

pub fn record_policy_reload(duration_secs: f64) {
    counter!(POLICY_RELOADS).increment(1);
    histogram!(POLICY_RELOAD_DURATION).record(duration_secs);
}

pub fn record_teardown(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(TEARDOWNS, "result" => result).increment(1);
}

pub fn record_identity_sync(count: u64) {
    counter!(IDENTITY_SYNC_USERS).increment(count);
}
