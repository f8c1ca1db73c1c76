use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, handler.",
};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Pass-through calls to the upstream provider. Tagged with operation, status.",
};

pub const MEMBERS_LISTED_PAGES: MetricDef = MetricDef {
    name: "members.listed",
    metric_type: MetricType::Histogram,
    description: "Pages fetched to list all members of a site",
};

pub const MEMBERS_DELETED: MetricDef = MetricDef {
    name: "members.deleted",
    metric_type: MetricType::Counter,
    description: "Member deletions issued upstream. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    UPSTREAM_REQUESTS,
    MEMBERS_LISTED_PAGES,
    MEMBERS_DELETED,
];
