// Domain models shared by the agent and the monitoring center

mod host;
mod metric;

pub use host::{Host, HostStatus, MAX_PRIORITY, MIN_PRIORITY};
pub use metric::{
    ContainerData, CpuData, DiskData, Metric, MetricBatch, MetricData, MetricType, PortData,
    ProcessData, RamData, StoredMetric,
};
