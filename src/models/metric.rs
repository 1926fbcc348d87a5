// Metric samples and batches (agent wire format + stored documents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Cpu,
    Ram,
    Disk,
    Process,
    Port,
    Container,
}

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::Cpu,
        MetricType::Ram,
        MetricType::Disk,
        MetricType::Process,
        MetricType::Port,
        MetricType::Container,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Cpu => "cpu",
            MetricType::Ram => "ram",
            MetricType::Disk => "disk",
            MetricType::Process => "process",
            MetricType::Port => "port",
            MetricType::Container => "container",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown metric type: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuData {
    pub usage_percent: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamData {
    pub total: u64,
    pub used: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskData {
    pub mount_point: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessData {
    pub name: String,
    pub pid: u32,
    pub status: String,
    pub cpu_usage: f64,
    pub ram_usage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortData {
    pub port: u16,
    pub protocol: String,
    /// "open", "closed" or "filtered".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerData {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    /// "running", "exited", ...
    pub state: String,
}

/// Type-specific detail payload. The variant decides the sample's `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    Cpu(CpuData),
    Ram(RamData),
    Disk(DiskData),
    Process(ProcessData),
    Port(PortData),
    Container(ContainerData),
}

impl MetricData {
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricData::Cpu(_) => MetricType::Cpu,
            MetricData::Ram(_) => MetricType::Ram,
            MetricData::Disk(_) => MetricType::Disk,
            MetricData::Process(_) => MetricType::Process,
            MetricData::Port(_) => MetricType::Port,
            MetricData::Container(_) => MetricType::Container,
        }
    }

    /// JSON object for the `data` field.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            MetricData::Cpu(d) => serde_json::to_value(d),
            MetricData::Ram(d) => serde_json::to_value(d),
            MetricData::Disk(d) => serde_json::to_value(d),
            MetricData::Process(d) => serde_json::to_value(d),
            MetricData::Port(d) => serde_json::to_value(d),
            MetricData::Container(d) => serde_json::to_value(d),
        }
    }

    /// Decodes a `data` object according to the declared type.
    pub fn from_json(metric_type: MetricType, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match metric_type {
            MetricType::Cpu => MetricData::Cpu(serde_json::from_value(value)?),
            MetricType::Ram => MetricData::Ram(serde_json::from_value(value)?),
            MetricType::Disk => MetricData::Disk(serde_json::from_value(value)?),
            MetricType::Process => MetricData::Process(serde_json::from_value(value)?),
            MetricType::Port => MetricData::Port(serde_json::from_value(value)?),
            MetricType::Container => MetricData::Container(serde_json::from_value(value)?),
        })
    }
}

/// One typed measurement. `value` is always the percentage-like summary,
/// `data` carries the detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireMetric", into = "WireMetric")]
pub struct Metric {
    pub value: f64,
    pub data: MetricData,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(data: MetricData, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            data,
            timestamp,
        }
    }

    pub fn metric_type(&self) -> MetricType {
        self.data.metric_type()
    }
}

/// `{ "type", "value", "data", "timestamp" }` as it travels over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMetric {
    #[serde(rename = "type")]
    metric_type: MetricType,
    value: f64,
    data: serde_json::Value,
    #[serde(default)]
    timestamp: DateTime<Utc>,
}

impl TryFrom<WireMetric> for Metric {
    type Error = String;

    fn try_from(wire: WireMetric) -> Result<Self, Self::Error> {
        let data = MetricData::from_json(wire.metric_type, wire.data)
            .map_err(|e| format!("invalid {} data: {}", wire.metric_type, e))?;
        Ok(Metric {
            value: wire.value,
            data,
            timestamp: wire.timestamp,
        })
    }
}

impl From<Metric> for WireMetric {
    fn from(m: Metric) -> Self {
        let metric_type = m.data.metric_type();
        // Plain structs of numbers and strings always encode.
        let data = m.data.to_json().unwrap_or(serde_json::Value::Null);
        WireMetric {
            metric_type,
            value: m.value,
            data,
            timestamp: m.timestamp,
        }
    }
}

/// One collection cycle's samples, sent and retried as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBatch {
    pub host_id: String,
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetricBatch {
    pub fn new(host_id: impl Into<String>, metrics: Vec<Metric>, timestamp: DateTime<Utc>) -> Self {
        Self {
            host_id: host_id.into(),
            metrics,
            timestamp: Some(timestamp),
        }
    }

    /// Declared timestamp, or `now` when unset or at/before the Unix epoch
    /// (zero-valued timestamps from some agents).
    pub fn effective_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.timestamp {
            Some(ts) if ts.timestamp_millis() > 0 => ts,
            _ => now,
        }
    }
}

/// A persisted sample, annotated with its batch's host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMetric {
    pub id: i64,
    pub host_id: String,
    #[serde(flatten)]
    pub metric: Metric,
}
