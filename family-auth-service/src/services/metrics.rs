//! Domain counters, exported through the Prometheus recorder installed by
//! `service_core::observability::install_prometheus_recorder`.

use metrics::counter;

pub fn record_onboarding(outcome: &'static str) {
    counter!("onboarding_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_login(scheme: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("auth_login_attempts_total", "scheme" => scheme, "outcome" => outcome).increment(1);
}

pub fn record_gate_denial(reason: &'static str) {
    counter!("access_gate_denials_total", "reason" => reason).increment(1);
}

pub fn record_notification(kind: &'static str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    counter!("notifications_total", "kind" => kind, "outcome" => outcome).increment(1);
}
