use std::path::Path;

use serde_json::json;
use suiteflow_core::error::CliError;
use suiteflow_core::executor::DependencyGraph;

use crate::catalog::load_catalog;
use crate::commands::cli::PlanArgs;

pub fn run_plan(args: &PlanArgs) -> Result<i32, CliError> {
    let units = load_catalog(Path::new(&args.units))?;
    let graph = DependencyGraph::build(&units)?;
    print!("{}", render_plan(&graph, &args.format));
    Ok(0)
}

pub fn render_plan(graph: &DependencyGraph, format: &str) -> String {
    let layers = graph.layer_ids();
    match format {
        "json" | "jsonl" => format!("{}\n", json!({ "units": graph.len(), "layers": layers })),
        _ => {
            let mut out = format!("{} units in {} layers\n", graph.len(), layers.len());
            for (idx, layer) in layers.iter().enumerate() {
                out.push_str(&format!("layer {idx}: {}\n", layer.join(", ")));
            }
            out
        }
    }
}
