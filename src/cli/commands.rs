//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use crate::state_machine::{State, TransitionGraph, build_transition_graph};
use crate::trajectory::{Run, Snapshot, infer_initial_state};
use crate::{Config, Result, trace};
use std::path::Path;

/// Where the state before day 0 comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialState {
    /// The same vector for every run
    Explicit(Snapshot),
    /// Every unit starts in this state
    Uniform(State),
}

impl InitialState {
    /// Initial vector for a run
    pub fn for_run(&self, run: &Run) -> Snapshot {
        match self {
            InitialState::Explicit(snapshot) => snapshot.clone(),
            InitialState::Uniform(state) => vec![*state; run.unit_count()],
        }
    }
}

/// Build the transition graph from the configured catalog
fn load_graph(config: &Config) -> Result<TransitionGraph> {
    let catalog = config.transition_catalog()?;
    tracing::debug!("Compiling catalog with {} edges", catalog.len());
    build_transition_graph(&catalog, config.compile_options())
}

/// First snapshot of every run in a trace
fn first_snapshots(input: &Path) -> Result<Vec<Snapshot>> {
    let mut firsts = Vec::new();
    for run in trace::open_trace(input)? {
        let run = run?;
        if let Some(first) = run.first_snapshot() {
            firsts.push(first.clone());
        }
    }
    tracing::info!("Collected first snapshots of {} runs", firsts.len());
    Ok(firsts)
}

/// Pick the initial state: explicit vector, inference, or a uniform state.
fn resolve_initial(
    config: &Config,
    graph: &TransitionGraph,
    input: &Path,
    initial: Option<Vec<State>>,
    guess_initial: bool,
) -> Result<InitialState> {
    if let Some(initial) = initial {
        return Ok(InitialState::Explicit(initial));
    }
    if guess_initial || config.decode.guess_initial {
        let firsts = first_snapshots(input)?;
        let inferred = infer_initial_state(&firsts, graph)?;
        tracing::info!("Inferred initial state for {} units", inferred.len());
        return Ok(InitialState::Explicit(inferred));
    }
    Ok(InitialState::Uniform(config.decode.initial_state.unwrap_or(0)))
}

/// Decode command implementation
pub mod decode {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::cli::output::{self, DecodedRun};
    use crate::trajectory;
    use std::path::PathBuf;

    /// Execute the decode command
    pub fn execute(
        config: &Config,
        input: PathBuf,
        initial: Option<Vec<State>>,
        guess_initial: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let graph = load_graph(config)?;
        let initial = resolve_initial(config, &graph, &input, initial, guess_initial)?;
        tracing::debug!("Initial state: {:?}", initial);

        let mut stdout = std::io::stdout().lock();
        let mut decoded = Vec::new();
        let mut total_events = 0;

        for run in trace::open_trace(&input)? {
            let run = run?;
            let start = initial.for_run(&run);
            let days = run.day_count();
            let events = trajectory::decode(run.trajectory, &start, &graph).inspect_err(|e| {
                tracing::error!("Run {} could not be decoded: {}", run.run, e);
                if e.is_missing_transition() {
                    tracing::error!("The trace and the transition catalog disagree");
                }
            })?;
            tracing::debug!("Run {}: {} events", run.run, events.len());
            total_events += events.len();

            let result = DecodedRun {
                run: run.run,
                days,
                events,
            };
            match format {
                OutputFormat::Jsonl => output::output_jsonl(&mut stdout, &result)?,
                OutputFormat::Json | OutputFormat::Table => decoded.push(result),
            }
        }

        tracing::info!("Decoded {} events", total_events);

        match format {
            OutputFormat::Json => output::output_json(&mut stdout, &decoded)?,
            OutputFormat::Table => output::output_table(&mut stdout, &decoded)?,
            OutputFormat::Jsonl => {}
        }
        Ok(())
    }
}

/// Infer-initial command implementation
pub mod infer_initial {
    use super::*;
    use crate::cli::output;
    use std::path::PathBuf;

    /// Execute the infer-initial command
    pub fn execute(config: &Config, input: PathBuf) -> Result<()> {
        let graph = load_graph(config)?;
        let firsts = first_snapshots(&input)?;
        let initial = infer_initial_state(&firsts, &graph)?;
        output::output_initial(&mut std::io::stdout().lock(), &initial)
    }
}

/// Graph command implementation
pub mod graph {
    use super::*;
    use crate::cli::{GraphFormat, output};
    use std::io::Write;

    /// Execute the graph command
    pub fn execute(config: &Config, format: GraphFormat) -> Result<()> {
        let graph = load_graph(config)?;
        let mut stdout = std::io::stdout().lock();
        match format {
            GraphFormat::Table => output::output_graph_table(&mut stdout, &graph),
            GraphFormat::Dot => {
                write!(stdout, "{}", graph.to_dot())?;
                Ok(())
            }
        }
    }
}

/// Observed command implementation
pub mod observed {
    use super::*;
    use crate::cli::output;
    use crate::state_machine::analyzer::{TransitionSummary, observed_state_changes};
    use std::path::PathBuf;

    /// Execute the observed command
    pub fn execute(config: &Config, input: PathBuf, initial: Option<Vec<State>>) -> Result<()> {
        let graph = load_graph(config)?;
        let initial = match initial {
            Some(initial) => InitialState::Explicit(initial),
            None => InitialState::Uniform(config.decode.initial_state.unwrap_or(0)),
        };

        let mut summary = TransitionSummary::new();
        let mut runs = 0;
        for run in trace::open_trace(&input)? {
            let run = run?;
            let start = initial.for_run(&run);
            summary.merge(&observed_state_changes(&start, &run.trajectory)?);
            runs += 1;
        }
        tracing::info!("Summarised state changes over {} runs", runs);

        output::output_observed(&mut std::io::stdout().lock(), &summary, &graph)
    }
}
