use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Submit a new investigation.
    Submit(SubmitArgs),
    /// Move a pending investigation to running.
    Start(IdArgs),
    /// Record progress on a running investigation.
    Advance(AdvanceArgs),
    /// Record an anomaly found by a running investigation.
    Anomaly(AnomalyArgs),
    /// Complete a running investigation.
    Complete(CompleteArgs),
    /// Fail a pending or running investigation.
    Fail(FailArgs),
    /// Start the oldest pending investigation on behalf of a worker.
    Claim(ClaimArgs),
    /// Get an investigation by ID.
    Get(IdArgs),
    /// List investigations.
    List(ListArgs),
    /// List anomalies recorded for an investigation.
    Anomalies(IdArgs),
    /// Query the audit trail.
    Audit(AuditArgs),
    /// Show JSONL lifecycle events for an investigation.
    Trail(IdArgs),
    /// Apply pending schema migrations and list applied revisions.
    Migrations,
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Clone, Debug, Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct SubmitArgs {
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub query: String,
    /// contracts, expenses, agreements, biddings, servants
    #[arg(long, default_value = "contracts")]
    pub source: String,
    #[arg(long)]
    pub session: Option<String>,
    /// Filter as key=value; value is parsed as JSON, falling back to a string.
    #[arg(long = "filter")]
    pub filters: Vec<String>,
    #[arg(long = "anomaly-type")]
    pub anomaly_types: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct AdvanceArgs {
    pub id: String,
    #[arg(long)]
    pub phase: String,
    /// Fraction of work done, 0.0 to 1.0.
    #[arg(long)]
    pub progress: f64,
    /// Records analyzed so far; keeps the recorded total when omitted.
    #[arg(long)]
    pub records: Option<u64>,
}

#[derive(Clone, Debug, Args)]
pub struct AnomalyArgs {
    pub id: String,
    #[arg(long = "type")]
    pub anomaly_type: String,
    /// low, medium, high, critical
    #[arg(long, default_value = "medium")]
    pub severity: String,
    #[arg(long)]
    pub confidence: f64,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub contract: Option<String>,
    /// Evidence as key=value; value is parsed as JSON, falling back to a string.
    #[arg(long = "evidence")]
    pub evidence: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct CompleteArgs {
    pub id: String,
    #[arg(long)]
    pub summary: String,
    #[arg(long, default_value_t = 0)]
    pub anomalies: u64,
    #[arg(long)]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Args)]
pub struct FailArgs {
    pub id: String,
    #[arg(long)]
    pub message: String,
}

#[derive(Clone, Debug, Args)]
pub struct ClaimArgs {
    #[arg(long)]
    pub worker: String,
}

#[derive(Clone, Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub oldest_first: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub investigation: Option<String>,
    #[arg(long)]
    pub action: Option<String>,
}
