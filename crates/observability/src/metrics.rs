//! Prometheus metrics exporter and HTTP request metrics

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Install the global Prometheus recorder with an HTTP listener serving
/// `/metrics` on `host:port`. Must run inside a tokio runtime.
pub fn init_metrics(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::new(ip, port);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(addr)
}

/// Request metrics for one HTTP server
///
/// * `http_requests_total{server}`
/// * `http_requests_by_status_total{server, status}`
/// * `http_request_duration_seconds{server}`
/// * `http_requests_in_flight{server}`
#[derive(Clone)]
pub struct ServerMetrics {
    requests_total: Counter,
    request_duration: Histogram,
    in_flight: Gauge,
    server_name: String,
}

impl ServerMetrics {
    pub fn new(server_name: &str) -> Self {
        let name = server_name.to_string();
        Self {
            requests_total: counter!("http_requests_total", "server" => name.clone()),
            request_duration: histogram!("http_request_duration_seconds", "server" => name.clone()),
            in_flight: gauge!("http_requests_in_flight", "server" => name.clone()),
            server_name: name,
        }
    }

    /// Record a completed request
    pub fn record_request(&self, duration: Duration, status_code: u16) {
        self.requests_total.increment(1);
        counter!(
            "http_requests_by_status_total",
            "server" => self.server_name.clone(),
            "status" => status_code.to_string()
        )
        .increment(1);
        self.request_duration.record(duration.as_secs_f64());
    }

    pub fn connection_opened(&self) {
        self.in_flight.increment(1.0);
    }

    pub fn connection_closed(&self) {
        self.in_flight.decrement(1.0);
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        let metrics = ServerMetrics::new("http");
        metrics.connection_opened();
        metrics.record_request(Duration::from_millis(5), 200);
        metrics.connection_closed();
        assert_eq!(metrics.server_name(), "http");
    }

    #[test]
    fn test_init_metrics_rejects_bad_host() {
        assert!(init_metrics("not-an-ip", 9090).is_err());
    }
}
