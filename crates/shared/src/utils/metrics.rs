use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::metrics::{counter::Counter, family::Family, gauge::Gauge};
use prometheus_client::registry::Registry;
use prometheus_client_derive_encode::{EncodeLabelSet, EncodeLabelValue};
use std::{
    fs,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use sysinfo::{Pid, ProcessesToUpdate, System};

fn thread_count(pid: u32) -> Option<i64> {
    let contents = fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    contents
        .lines()
        .find(|line| line.starts_with("Threads:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|count| count.parse().ok())
}

#[derive(Debug, Clone)]
pub struct SystemMetrics {
    pub memory_resident_bytes: Gauge,
    pub memory_virtual_bytes: Gauge,
    pub thread_usage: Gauge,
    pub cpu_usage_percent: Gauge,
    pub process_start_time: Gauge,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics {
    pub fn new() -> Self {
        let metrics = Self {
            memory_resident_bytes: Gauge::default(),
            memory_virtual_bytes: Gauge::default(),
            thread_usage: Gauge::default(),
            cpu_usage_percent: Gauge::default(),
            process_start_time: Gauge::default(),
        };

        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        metrics.process_start_time.set(started);

        metrics
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "process_resident_memory_bytes",
            "Resident memory of the process in bytes",
            self.memory_resident_bytes.clone(),
        );
        registry.register(
            "process_virtual_memory_bytes",
            "Virtual memory of the process in bytes",
            self.memory_virtual_bytes.clone(),
        );
        registry.register(
            "process_threads",
            "Number of OS threads",
            self.thread_usage.clone(),
        );
        registry.register(
            "process_cpu_usage_percent",
            "CPU usage of the process",
            self.cpu_usage_percent.clone(),
        );
        registry.register(
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
            self.process_start_time.clone(),
        );
    }

    pub fn update(&self, sys: &mut System) {
        let pid = std::process::id();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]), true);

        if let Some(process) = sys.process(Pid::from_u32(pid)) {
            self.memory_resident_bytes.set(process.memory() as i64);
            self.memory_virtual_bytes.set(process.virtual_memory() as i64);
            self.cpu_usage_percent.set(process.cpu_usage() as i64);
        }

        if let Some(count) = thread_count(pid) {
            self.thread_usage.set(count);
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Method {
    Get,
    Post,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Status {
    Success,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum ProviderCall {
    Create,
    GetPayment,
    Approve,
    Complete,
    Cancel,
    Me,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum PaymentStage {
    Created,
    Approved,
    Completed,
    Cancelled,
    Disputed,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub method: Method,
    pub operation: String,
    pub status: Status,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProviderLabels {
    pub call: ProviderCall,
    pub status: Status,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StageLabels {
    pub stage: PaymentStage,
}

#[derive(Clone, Debug)]
pub struct Metrics {
    pub request_counter: Family<OperationLabels, Counter>,
    pub request_duration: Family<OperationLabels, Histogram>,
    pub provider_requests: Family<ProviderLabels, Counter>,
    pub provider_retries: Counter,
    pub payment_transitions: Family<StageLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_counter: Family::default(),
            request_duration: Family::new_with_constructor(|| {
                Histogram::new(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ])
            }),
            provider_requests: Family::default(),
            provider_retries: Counter::default(),
            payment_transitions: Family::default(),
        }
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "service_requests",
            "Service operations by method, name and outcome",
            self.request_counter.clone(),
        );
        registry.register(
            "service_request_duration_seconds",
            "Service operation latency",
            self.request_duration.clone(),
        );
        registry.register(
            "pi_api_requests",
            "Calls made to the Pi Platform API",
            self.provider_requests.clone(),
        );
        registry.register(
            "pi_api_retries",
            "Retried Pi Platform API attempts",
            self.provider_retries.clone(),
        );
        registry.register(
            "payment_transitions",
            "Order status transitions",
            self.payment_transitions.clone(),
        );
    }

    pub fn record(&self, method: Method, operation: &str, status: Status, duration_secs: f64) {
        let labels = OperationLabels {
            method,
            operation: operation.to_string(),
            status,
        };
        self.request_counter.get_or_create(&labels).inc();
        self.request_duration
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    pub fn record_provider(&self, call: ProviderCall, status: Status) {
        self.provider_requests
            .get_or_create(&ProviderLabels { call, status })
            .inc();
    }

    pub fn record_transition(&self, stage: PaymentStage) {
        self.payment_transitions
            .get_or_create(&StageLabels { stage })
            .inc();
    }
}

pub async fn run_metrics_collector(system_metrics: Arc<SystemMetrics>) {
    let mut sys = System::new();
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(15));
    loop {
        interval.tick().await;
        system_metrics.update(&mut sys);
    }
}
