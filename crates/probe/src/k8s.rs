//! Kubernetes-backed [`Orchestrator`] using in-cluster identity.
//!
//! Pod inventory and desired replica counts come from the core/apps APIs,
//! usage from metrics.k8s.io, and container disk use from the exec
//! subresource over its WebSocket protocol.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::Connector;
use tracing::warn;

use switchyard_core::{Error, Result};

use crate::orchestrator::{ContainerSpec, Orchestrator, PodSnapshot, PodUsage, WorkloadSpec};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Exec sessions answer a single short command; bound them tightly.
const EXEC_TIMEOUT: Duration = Duration::from_secs(10);

/// In-cluster Kubernetes API client.
pub struct K8sApi {
    http: reqwest::Client,
    ws_tls: Arc<rustls::ClientConfig>,
    host: String,
    port: String,
    token: String,
    namespace: String,
    metrics_warned: AtomicBool,
}

impl K8sApi {
    /// Build a client from the pod's service-account identity. Fails outside
    /// a cluster (no `KUBERNETES_SERVICE_HOST`).
    pub fn in_cluster(namespace: &str) -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| Error::Orchestrator("not running inside a cluster".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT_HTTPS")
            .or_else(|_| std::env::var("KUBERNETES_SERVICE_PORT"))
            .unwrap_or_else(|_| "443".to_string());

        let token = std::fs::read_to_string(format!("{SERVICE_ACCOUNT_DIR}/token"))?
            .trim()
            .to_string();
        let ca_pem = std::fs::read(format!("{SERVICE_ACCOUNT_DIR}/ca.crt"))?;

        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .add_root_certificate(
                reqwest::Certificate::from_pem(&ca_pem)
                    .map_err(|e| Error::Orchestrator(format!("cluster CA: {e}")))?,
            )
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Orchestrator(format!("http client: {e}")))?;

        Ok(Self {
            http,
            ws_tls: build_ws_tls(&ca_pem)?,
            host,
            port,
            token,
            namespace: namespace.to_string(),
            metrics_warned: AtomicBool::new(false),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("https://{}:{}{}", self.host, self.port, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Orchestrator(format!("GET {path}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Orchestrator(format!("GET {path}: {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Orchestrator(format!("GET {path}: {e}")))
    }
}

#[async_trait]
impl Orchestrator for K8sApi {
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>> {
        let list: PodList = self
            .get_json(&format!("/api/v1/namespaces/{}/pods", self.namespace))
            .await?;
        Ok(list.items.into_iter().map(to_pod_snapshot).collect())
    }

    async fn pod_usage(&self) -> Result<Vec<PodUsage>> {
        let path = format!(
            "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods",
            self.namespace
        );
        match self.get_json::<PodMetricsList>(&path).await {
            Ok(list) => Ok(list.items.into_iter().map(to_pod_usage).collect()),
            Err(e) => {
                if !self.metrics_warned.swap(true, Ordering::Relaxed) {
                    warn!(error = %e, "pod metrics API unavailable");
                }
                Err(e)
            }
        }
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadSpec>> {
        let mut workloads = Vec::new();
        for kind in ["deployments", "statefulsets"] {
            let list: WorkloadList = self
                .get_json(&format!(
                    "/apis/apps/v1/namespaces/{}/{kind}",
                    self.namespace
                ))
                .await?;
            workloads.extend(list.items.into_iter().map(|w| WorkloadSpec {
                name: w.metadata.name,
                desired_replicas: w.spec.replicas.unwrap_or(0).max(0) as usize,
            }));
        }
        Ok(workloads)
    }

    async fn exec(&self, pod: &str, container: &str, command: &[&str]) -> Result<String> {
        let mut query = format!(
            "container={}&stdout=true&stderr=true",
            urlencoding::encode(container)
        );
        for part in command {
            query.push_str("&command=");
            query.push_str(&urlencoding::encode(part));
        }
        let url = format!(
            "wss://{}:{}/api/v1/namespaces/{}/pods/{}/exec?{query}",
            self.host, self.port, self.namespace, pod
        );

        let mut request = url
            .into_client_request()
            .map_err(|e| Error::Orchestrator(format!("exec request: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            format!("Bearer {}", self.token)
                .parse()
                .map_err(|_| Error::Orchestrator("token not header-safe".into()))?,
        );
        headers.insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static("v4.channel.k8s.io"),
        );

        let (mut socket, _) = tokio_tungstenite::connect_async_tls_with_config(
            request,
            None,
            false,
            Some(Connector::Rustls(self.ws_tls.clone())),
        )
        .await
        .map_err(|e| Error::Orchestrator(format!("exec connect to {pod}: {e}")))?;

        // Frames are channel-tagged: byte 0 is the channel, 1=stdout,
        // 2=stderr, 3=server error record.
        let mut stdout = Vec::new();
        let mut server_error = Vec::new();
        let drain = async {
            while let Some(frame) = socket.next().await {
                match frame {
                    Ok(Message::Binary(data)) if data.len() > 1 => match data[0] {
                        1 => stdout.extend_from_slice(&data[1..]),
                        3 => server_error.extend_from_slice(&data[1..]),
                        _ => {}
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
        };
        if tokio::time::timeout(EXEC_TIMEOUT, drain).await.is_err() {
            warn!(pod, "exec session exceeded its deadline");
        }

        if stdout.is_empty() && !server_error.is_empty() {
            return Err(Error::Orchestrator(format!(
                "exec in {pod} failed: {}",
                String::from_utf8_lossy(&server_error)
            )));
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

fn build_ws_tls(ca_pem: &[u8]) -> Result<Arc<rustls::ClientConfig>> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut &ca_pem[..]) {
        let cert = cert.map_err(|e| Error::Orchestrator(format!("cluster CA: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| Error::Orchestrator(format!("cluster CA: {e}")))?;
    }
    Ok(Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    ))
}

// ── API wire slices ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct PodList {
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: Metadata,
    spec: PodSpec,
    status: PodStatus,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    node_name: Option<String>,
    containers: Vec<Container>,
}

#[derive(Deserialize)]
struct Container {
    name: String,
    ports: Option<Vec<ContainerPort>>,
    resources: Option<Resources>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPort {
    container_port: u16,
}

#[derive(Deserialize)]
struct Resources {
    requests: Option<HashMap<String, String>>,
    limits: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct PodStatus {
    phase: Option<String>,
}

#[derive(Deserialize)]
struct PodMetricsList {
    items: Vec<PodMetrics>,
}

#[derive(Deserialize)]
struct PodMetrics {
    metadata: Metadata,
    containers: Vec<ContainerMetrics>,
}

#[derive(Deserialize)]
struct ContainerMetrics {
    usage: HashMap<String, String>,
}

#[derive(Deserialize)]
struct WorkloadList {
    items: Vec<Workload>,
}

#[derive(Deserialize)]
struct Workload {
    metadata: Metadata,
    spec: WorkloadReplicas,
}

#[derive(Deserialize)]
struct WorkloadReplicas {
    replicas: Option<i32>,
}

fn to_pod_snapshot(pod: Pod) -> PodSnapshot {
    let containers = pod
        .spec
        .containers
        .into_iter()
        .map(|c| {
            let requests = c.resources.as_ref().and_then(|r| r.requests.as_ref());
            let limits = c.resources.as_ref().and_then(|r| r.limits.as_ref());
            ContainerSpec {
                ports: c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| p.container_port)
                    .collect(),
                cpu_request_millis: requests
                    .and_then(|m| m.get("cpu"))
                    .map(|q| parse_cpu_millis(q))
                    .unwrap_or(0),
                memory_limit_bytes: limits
                    .and_then(|m| m.get("memory"))
                    .map(|q| parse_memory_bytes(q))
                    .unwrap_or(0),
                name: c.name,
            }
        })
        .collect();
    PodSnapshot {
        name: pod.metadata.name,
        node: pod.spec.node_name.unwrap_or_default(),
        phase: pod.status.phase.unwrap_or_default(),
        containers,
    }
}

fn to_pod_usage(metrics: PodMetrics) -> PodUsage {
    let mut cpu_used_millis = 0;
    let mut memory_used_bytes = 0;
    for container in &metrics.containers {
        if let Some(cpu) = container.usage.get("cpu") {
            cpu_used_millis += parse_cpu_millis(cpu);
        }
        if let Some(memory) = container.usage.get("memory") {
            memory_used_bytes += parse_memory_bytes(memory);
        }
    }
    PodUsage {
        pod: metrics.metadata.name,
        cpu_used_millis,
        memory_used_bytes,
    }
}

/// Parse a Kubernetes CPU quantity into millicores. The metrics API reports
/// nanocores ("12345678n"); specs use millicores ("500m") or whole cores.
pub fn parse_cpu_millis(quantity: &str) -> i64 {
    let q = quantity.trim();
    if let Some(n) = q.strip_suffix('n') {
        n.parse::<i64>().map(|v| v / 1_000_000).unwrap_or(0)
    } else if let Some(u) = q.strip_suffix('u') {
        u.parse::<i64>().map(|v| v / 1_000).unwrap_or(0)
    } else if let Some(m) = q.strip_suffix('m') {
        m.parse::<i64>().unwrap_or(0)
    } else {
        q.parse::<f64>().map(|v| (v * 1000.0) as i64).unwrap_or(0)
    }
}

/// Parse a Kubernetes memory quantity into bytes.
pub fn parse_memory_bytes(quantity: &str) -> i64 {
    let q = quantity.trim();
    let binary = [("Ki", 1 << 10), ("Mi", 1 << 20), ("Gi", 1 << 30), ("Ti", 1u64 << 40)];
    for (suffix, factor) in binary {
        if let Some(n) = q.strip_suffix(suffix) {
            return n
                .parse::<f64>()
                .map(|v| (v * factor as f64) as i64)
                .unwrap_or(0);
        }
    }
    let decimal = [("k", 1_000u64), ("M", 1_000_000), ("G", 1_000_000_000), ("T", 1_000_000_000_000)];
    for (suffix, factor) in decimal {
        if let Some(n) = q.strip_suffix(suffix) {
            return n
                .parse::<f64>()
                .map(|v| (v * factor as f64) as i64)
                .unwrap_or(0);
        }
    }
    q.parse::<i64>().unwrap_or(0)
}
