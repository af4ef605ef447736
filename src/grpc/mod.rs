//! gRPC services served on the shared port.
//!
//! The standard `grpc.health.v1.Health` service is always available. Its
//! overall status (service name `""`) starts NOT_SERVING and is driven by the
//! readiness monitor afterwards.

use tonic::service::Routes;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;

/// Health service routes and the reporter that controls them.
pub async fn health_service() -> (HealthReporter, Routes) {
    let (reporter, service) = tonic_health::server::health_reporter();
    reporter.set_service_status("", ServingStatus::NotServing).await;
    (reporter, Routes::new(service))
}
