use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "suiteflow", version, about = "Dependency-ordered build orchestration")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file. Defaults to $SUITEFLOW_CONFIG, ~/.suiteflow/config.toml,
    /// then ./suiteflow.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// Unit catalog (TOML with `[[unit]]` tables).
    #[arg(long)]
    pub units: String,

    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Unit catalog (TOML with `[[unit]]` tables).
    #[arg(long)]
    pub units: String,

    /// Initial concurrency limit. Overrides `scheduler.max_parallel`.
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Stay alive when idle; exit only on drain or abort.
    #[arg(long, default_value_t = false)]
    pub keep_alive: bool,

    /// Event output: text or jsonl. Overrides `report.format`.
    #[arg(long)]
    pub format: Option<String>,

    /// Print unit phase transitions.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    #[arg(long)]
    pub run_id: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub run_args: RunArgs,

    /// Snapshot file, or `latest` to pick the newest one in
    /// `compaction.snapshot_dir`.
    #[arg(long)]
    pub snapshot: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the dependency layers without running anything.
    Plan(PlanArgs),
    Run(RunArgs),
    /// Continue a run from a persisted compaction snapshot.
    Resume(ResumeArgs),
}
