//! Output formatting module
//!
//! This module handles formatting decoded events, graphs and summaries for
//! the different output formats.

use crate::{
    Result,
    state_machine::{TransitionGraph, analyzer::{TransitionSummary, detect_pattern}},
    trajectory::{Event, Snapshot},
};
use serde::Serialize;
use serde_json::json;

/// Events decoded from one run
#[derive(Debug, Clone, Serialize)]
pub struct DecodedRun {
    pub run: u32,
    pub days: usize,
    pub events: Vec<Event>,
}

/// Output all decoded runs as one JSON document
pub fn output_json(w: &mut impl std::io::Write, runs: &[DecodedRun]) -> Result<()> {
    let output = json!({
        "summary": {
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "total_runs": runs.len(),
            "total_events": runs.iter().map(|r| r.events.len()).sum::<usize>(),
        },
        "runs": runs,
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?; // Add trailing newline
    Ok(())
}

/// Output one run as JSON lines, one event per line
pub fn output_jsonl(w: &mut impl std::io::Write, run: &DecodedRun) -> Result<()> {
    for event in &run.events {
        let line = json!({
            "run": run.run,
            "transition": event.transition,
            "subject": event.subject,
            "source": event.source,
            "day": event.day,
        });
        serde_json::to_writer(&mut *w, &line)?;
        writeln!(w)?;
    }
    Ok(())
}

/// Output decoded runs as text table
pub fn output_table(w: &mut impl std::io::Write, runs: &[DecodedRun]) -> Result<()> {
    writeln!(w, "NAADSM Event Decoding - Results")?;
    writeln!(w, "{}", "=".repeat(60))?;
    writeln!(w)?;

    writeln!(w, "Summary:")?;
    writeln!(w, "  Total Runs:   {}", runs.len())?;
    writeln!(
        w,
        "  Total Events: {}",
        runs.iter().map(|r| r.events.len()).sum::<usize>()
    )?;
    writeln!(w)?;

    for run in runs {
        writeln!(w, "Run {} ({} days, {} events):", run.run, run.days, run.events.len())?;
        if run.events.is_empty() {
            writeln!(w)?;
            continue;
        }
        writeln!(w, "{:-<60}", "")?;
        writeln!(
            w,
            "{:>6} {:>12} {:>10} {:>10}",
            "Day", "Transition", "Subject", "Source"
        )?;
        writeln!(w, "{:-<60}", "")?;
        for event in &run.events {
            writeln!(
                w,
                "{:>6} {:>12} {:>10} {:>10}",
                event.day, event.transition, event.subject, event.source
            )?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Output the compiled paths of a graph as text table
pub fn output_graph_table(w: &mut impl std::io::Write, graph: &TransitionGraph) -> Result<()> {
    let stats = graph.stats();
    let report = detect_pattern(graph);

    writeln!(w, "Transition Graph")?;
    writeln!(w, "{}", "=".repeat(60))?;
    writeln!(w, "  Pattern:         {}", report.pattern.display_name())?;
    writeln!(w, "  States:          {}", stats.states)?;
    writeln!(w, "  Direct Edges:    {}", stats.direct_edges)?;
    writeln!(w, "  Compiled Paths:  {}", stats.compiled_paths)?;
    writeln!(w, "  Max Depth:       {}", report.max_depth)?;
    writeln!(w, "  Branching:       {:.2}", report.branching_factor)?;
    writeln!(w, "  Has Cycles:      {}", report.has_cycles)?;
    for (from, to) in graph.truncated_edges() {
        writeln!(w, "  Truncated Edge:  {} -> {}", from, to)?;
    }
    writeln!(w)?;

    writeln!(w, "{:>6} {:>6}  {:<30}", "From", "To", "Transitions")?;
    writeln!(w, "{:-<60}", "")?;
    for (from, to) in graph.compiled_pairs() {
        let transitions = graph
            .transitions(from, to)?
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(w, "{:>6} {:>6}  {:<30}", from, to, transitions)?;
    }
    writeln!(w)?;

    writeln!(w, "{:>6}  {:<30}", "State", "Possible Previous States")?;
    writeln!(w, "{:-<60}", "")?;
    for state in graph.states() {
        let previous = match graph.possible_previous_states(state) {
            Ok(states) => states
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => "unreachable".to_string(),
        };
        writeln!(w, "{:>6}  {:<30}", state, previous)?;
    }

    Ok(())
}

/// Output observed state change counts
pub fn output_observed(
    w: &mut impl std::io::Write,
    summary: &TransitionSummary,
    graph: &TransitionGraph,
) -> Result<()> {
    let unexplained = summary.unexplained(graph);

    writeln!(w, "{:>6} {:>6} {:>10}  {}", "From", "To", "Count", "Transitions")?;
    writeln!(w, "{:-<60}", "")?;
    for (from, to, count) in summary.entries() {
        let transitions = match graph.transitions(from, to) {
            Ok(ids) => ids
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => "MISSING".to_string(),
        };
        writeln!(w, "{:>6} {:>6} {:>10}  {}", from, to, count, transitions)?;
    }

    if !unexplained.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{} observed state change(s) have no path in the catalog",
            unexplained.len()
        )?;
    }
    Ok(())
}

/// Output an initial state vector on one line
pub fn output_initial(w: &mut impl std::io::Write, initial: &Snapshot) -> Result<()> {
    let line = initial
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(w, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{TransitionCatalog, analyzer::observed_state_changes};

    fn create_test_runs() -> Vec<DecodedRun> {
        vec![
            DecodedRun {
                run: 5620,
                days: 3,
                events: vec![Event::state_change(0, 1, 0), Event::state_change(1, 1, 2)],
            },
            DecodedRun {
                run: 5621,
                days: 3,
                events: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_output_json() {
        let mut output = Vec::new();
        output_json(&mut output, &create_test_runs()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["summary"]["total_runs"], 2);
        assert_eq!(value["summary"]["total_events"], 2);
        assert_eq!(value["runs"][0]["events"][1]["day"], 2);
    }

    #[test]
    fn test_output_jsonl() {
        let runs = create_test_runs();
        let mut output = Vec::new();
        output_jsonl(&mut output, &runs[0]).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["run"], 5620);
        assert_eq!(first["subject"], 1);
    }

    #[test]
    fn test_output_table() {
        let mut output = Vec::new();
        output_table(&mut output, &create_test_runs()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Run 5620 (3 days, 2 events)"));
        assert!(text.contains("Total Events: 2"));
    }

    #[test]
    fn test_output_graph_table() {
        let graph = TransitionGraph::build(&TransitionCatalog::naadsm()).unwrap();
        let mut output = Vec::new();
        output_graph_table(&mut output, &graph).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Pattern:         Cyclic"));
        assert!(text.contains("Truncated Edge:  4 -> 0"));
        assert!(text.contains("Branching:       1.00"));
        assert!(text.contains("Has Cycles:      true"));
        assert!(text.contains("Max Depth:       4"));
        assert!(text.contains("0 1 2 3"));
    }

    #[test]
    fn test_output_observed_flags_missing() {
        let graph = TransitionGraph::build(&TransitionCatalog::naadsm()).unwrap();
        let summary = observed_state_changes(&vec![0, 2], &vec![vec![1, 0]]).unwrap();
        let mut output = Vec::new();
        output_observed(&mut output, &summary, &graph).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("MISSING"));
        assert!(text.contains("1 observed state change(s) have no path"));
    }

    #[test]
    fn test_output_initial() {
        let mut output = Vec::new();
        output_initial(&mut output, &vec![0, 1, 0]).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "0 1 0\n");
    }
}
