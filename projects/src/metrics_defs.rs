use shared::metrics_defs::{MetricDef, MetricType};

pub const PROJECTS_CONFIGURED: MetricDef = MetricDef {
    name: "projects.configured",
    metric_type: MetricType::Gauge,
    description: "Number of projects in the currently installed project list",
};

pub const ALL_METRICS: &[MetricDef] = &[PROJECTS_CONFIGURED];
