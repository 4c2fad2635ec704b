//! Generation state machine.
//!
//! A [`Generator`] walks the fixed [`STEPS`] list with a cursor. Each
//! [`Step::Run`] executes one stage; [`Step::RepeatUntilConverged`] jumps the
//! cursor back to the start of the hydrology/erosion cycle until the solver
//! settles or hits its iteration cap. The cursor and the last erosion result
//! are the only loop state.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use super::{ConvergenceNotReached, GenerationError, GenerationEvent, WorldConfig};
use crate::biomes::{classify_world, BiomeClassifier, BiomeGrid, WhittakerClassifier};
use crate::climate::{apply_lapse_rate, initialize_climate};
use crate::erosion::{build_drainage_graph, mark_river_mouths, DrainageGraph, ErosionSolver, ErosionStep};
use crate::geometry::{poisson, PlanarGraph, SamplePoints};
use crate::noise::NoiseFields;
use crate::tectonics::{assign_plates, propagate_uplift, seed_uplift};
use crate::terrain::World;

/// Where a generator is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationState {
    NotStarted,
    Initializing,
    GeneratingSamplePoints,
    InitializingCells,
    InitializingTectonics,
    CalculatingUplift,
    PropagatingUplift,
    FindingRiverMouths,
    PreparingStreamGraph,
    SolvingErosion,
    AdjustingTemperature,
    SettingBiomes,
    Completed,
    Failed,
}

impl GenerationState {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            GenerationState::NotStarted => "not-started",
            GenerationState::Initializing => "initializing",
            GenerationState::GeneratingSamplePoints => "generating-sample-points",
            GenerationState::InitializingCells => "initializing-cells",
            GenerationState::InitializingTectonics => "initializing-tectonics",
            GenerationState::CalculatingUplift => "calculating-uplift",
            GenerationState::PropagatingUplift => "propagating-uplift",
            GenerationState::FindingRiverMouths => "finding-river-mouths",
            GenerationState::PreparingStreamGraph => "preparing-stream-graph",
            GenerationState::SolvingErosion => "solving-erosion",
            GenerationState::AdjustingTemperature => "adjusting-temperature",
            GenerationState::SettingBiomes => "setting-biomes",
            GenerationState::Completed => "completed",
            GenerationState::Failed => "failed",
        }
    }

    /// Progress message emitted when the stage finishes.
    pub fn message(&self) -> &'static str {
        match self {
            GenerationState::NotStarted => "Waiting to start",
            GenerationState::Initializing => "Initialized generator",
            GenerationState::GeneratingSamplePoints => "Generated sample points",
            GenerationState::InitializingCells => "Built cell graph",
            GenerationState::InitializingTectonics => "Assigned tectonic plates",
            GenerationState::CalculatingUplift => "Calculated boundary uplift",
            GenerationState::PropagatingUplift => "Propagated uplift",
            GenerationState::FindingRiverMouths => "Found river mouths",
            GenerationState::PreparingStreamGraph => "Prepared stream graph",
            GenerationState::SolvingErosion => "Solved erosion step",
            GenerationState::AdjustingTemperature => "Adjusted temperature for height",
            GenerationState::SettingBiomes => "Set biomes",
            GenerationState::Completed => "Generation completed",
            GenerationState::Failed => "Generation failed",
        }
    }

    /// True for `Completed` and `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self, GenerationState::Completed | GenerationState::Failed)
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Run(GenerationState),
    /// Jump back to step index `first` while erosion has not converged and the
    /// iteration cap has not been reached.
    RepeatUntilConverged { first: usize },
}

/// The pipeline, in order.
pub const STEPS: &[Step] = &[
    Step::Run(GenerationState::Initializing),
    Step::Run(GenerationState::GeneratingSamplePoints),
    Step::Run(GenerationState::InitializingCells),
    Step::Run(GenerationState::InitializingTectonics),
    Step::Run(GenerationState::CalculatingUplift),
    Step::Run(GenerationState::PropagatingUplift),
    Step::Run(GenerationState::FindingRiverMouths),
    Step::Run(GenerationState::PreparingStreamGraph),
    Step::Run(GenerationState::SolvingErosion),
    Step::RepeatUntilConverged { first: 6 },
    Step::Run(GenerationState::AdjustingTemperature),
    Step::Run(GenerationState::SettingBiomes),
];

fn missing(stage: GenerationState, what: &str) -> GenerationError {
    GenerationError::StageFailed {
        stage,
        reason: format!("{} not available", what),
    }
}

fn panicked(stage: GenerationState, payload: Box<dyn Any + Send>) -> GenerationError {
    let reason = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    };
    GenerationError::StageFailed { stage, reason }
}

/// Resumable world generator.
///
/// Drive it with [`step`](Self::step) or [`run`](Self::run) on the current
/// thread, or move it to a worker with [`spawn`](Self::spawn). Queries are
/// answered once the state is `Completed`.
pub struct Generator {
    pub(super) config: WorldConfig,
    noise_override: Option<NoiseFields>,
    classifier: Arc<dyn BiomeClassifier>,
    events: Option<Sender<GenerationEvent>>,

    pub(super) state: GenerationState,
    cursor: usize,
    started: Option<Instant>,

    rng: ChaCha8Rng,
    pub(super) noise: NoiseFields,
    samples: Option<SamplePoints>,
    pub(super) world: Option<World>,
    drainage: DrainageGraph,
    pub(super) biome_grid: Option<BiomeGrid>,
    erosion_iterations: u32,
    last_erosion: Option<ErosionStep>,
    warnings: Vec<ConvergenceNotReached>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("seed", &self.config.seed)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("cells", &self.world.as_ref().map(World::len))
            .field("erosion_iterations", &self.erosion_iterations)
            .finish()
    }
}

impl Generator {
    /// Creates a generator with the default noise fields and the Whittaker classifier.
    ///
    /// The configuration is validated by the first stage, so an invalid one
    /// surfaces as a `Failed` state rather than here.
    pub fn new(config: WorldConfig) -> Self {
        let classifier = Arc::new(WhittakerClassifier::new(config.biomes.clone()));
        Self::build(config, None, classifier)
    }

    /// Creates a generator with injected noise fields and biome classifier.
    pub fn with_services(
        config: WorldConfig,
        noise: NoiseFields,
        classifier: Arc<dyn BiomeClassifier>,
    ) -> Self {
        Self::build(config, Some(noise), classifier)
    }

    fn build(
        config: WorldConfig,
        noise_override: Option<NoiseFields>,
        classifier: Arc<dyn BiomeClassifier>,
    ) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            noise_override,
            classifier,
            events: None,
            state: GenerationState::NotStarted,
            cursor: 0,
            started: None,
            noise: NoiseFields::constant(0.0),
            samples: None,
            world: None,
            drainage: DrainageGraph::default(),
            biome_grid: None,
            erosion_iterations: 0,
            last_erosion: None,
            warnings: Vec::new(),
        }
    }

    /// Sends progress events to `sender`.
    pub fn with_events(mut self, sender: Sender<GenerationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// The world in whatever state the last stage left it.
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn drainage(&self) -> &DrainageGraph {
        &self.drainage
    }

    pub fn biome_grid(&self) -> Option<&BiomeGrid> {
        self.biome_grid.as_ref()
    }

    /// Number of erosion solver iterations run so far.
    pub fn erosion_iterations(&self) -> u32 {
        self.erosion_iterations
    }

    /// Non-fatal problems recorded during the run.
    pub fn warnings(&self) -> &[ConvergenceNotReached] {
        &self.warnings
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    fn emit(&self, event: GenerationEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(event);
        }
    }

    /// Executes the next stage and returns the resulting state.
    ///
    /// The final stage moves the generator straight to `Completed`. Calling
    /// `step` on a finished generator is a no-op.
    pub fn step(&mut self) -> Result<GenerationState, GenerationError> {
        if self.state.is_finished() {
            return Ok(self.state);
        }
        if self.state == GenerationState::NotStarted {
            self.started = Some(Instant::now());
            info!(seed = self.config.seed, "generation started");
            self.emit(GenerationEvent::Started);
        }

        let stage = match STEPS.get(self.cursor) {
            Some(Step::Run(stage)) => *stage,
            _ => return Err(missing(self.state, "next stage")),
        };
        self.state = stage;

        // Injected noise fields and classifiers may panic; that still fails the run.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(stage)))
            .unwrap_or_else(|payload| Err(panicked(stage, payload)));
        if let Err(error) = outcome {
            self.state = GenerationState::Failed;
            error!(stage = %stage, %error, "generation failed");
            self.emit(GenerationEvent::Failed { error: error.clone() });
            return Err(error);
        }

        let elapsed = self.elapsed();
        info!(stage = %stage, ?elapsed, "{}", stage.message());
        self.emit(GenerationEvent::Progress {
            message: stage.message().to_string(),
            elapsed,
        });

        self.advance();
        if self.cursor >= STEPS.len() {
            self.state = GenerationState::Completed;
            let elapsed = self.elapsed();
            info!(?elapsed, "generation completed");
            self.emit(GenerationEvent::Completed { elapsed });
        }
        Ok(self.state)
    }

    /// Steps until `Completed`.
    pub fn run(&mut self) -> Result<(), GenerationError> {
        if self.state == GenerationState::Failed {
            return Err(GenerationError::InvalidState { state: self.state });
        }
        while !self.state.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    /// Discards all generated data and returns to `NotStarted`.
    pub fn reset(&mut self) {
        self.state = GenerationState::NotStarted;
        self.cursor = 0;
        self.started = None;
        self.clear_outputs();
    }

    /// Resets and runs the whole pipeline again from `Initializing`.
    pub fn regenerate(&mut self) -> Result<(), GenerationError> {
        self.reset();
        self.run()
    }

    /// Runs the generator on a background thread.
    ///
    /// Events go to the returned handle, replacing any sender set with
    /// [`with_events`](Self::with_events).
    pub fn spawn(mut self) -> GenerationHandle {
        let (sender, events) = mpsc::channel();
        self.events = Some(sender);
        let worker = thread::spawn(move || {
            let result = self.run();
            (self, result)
        });
        GenerationHandle { events, worker }
    }

    fn clear_outputs(&mut self) {
        self.samples = None;
        self.world = None;
        self.drainage = DrainageGraph::default();
        self.biome_grid = None;
        self.erosion_iterations = 0;
        self.last_erosion = None;
        self.warnings.clear();
    }

    /// Moves the cursor past the stage just run, resolving loop markers.
    fn advance(&mut self) {
        self.cursor += 1;
        while let Some(Step::RepeatUntilConverged { first }) = STEPS.get(self.cursor) {
            if self.erosion_should_repeat() {
                self.cursor = *first;
            } else {
                self.cursor += 1;
            }
        }
    }

    fn erosion_should_repeat(&mut self) -> bool {
        let Some(last) = self.last_erosion else {
            return false;
        };
        if last.converged {
            info!(
                iterations = self.erosion_iterations,
                max_delta = last.max_delta,
                "erosion converged"
            );
            return false;
        }
        if self.erosion_iterations < self.config.erosion.max_iterations {
            return true;
        }

        let warning = ConvergenceNotReached {
            iterations: self.erosion_iterations,
            max_delta: last.max_delta,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
        false
    }

    fn execute(&mut self, stage: GenerationState) -> Result<(), GenerationError> {
        match stage {
            GenerationState::Initializing => {
                self.config.validate()?;
                self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
                self.noise = match &self.noise_override {
                    Some(noise) => noise.clone(),
                    None => NoiseFields::from_config(
                        self.config.seed,
                        self.config.bounds.width,
                        &self.config.noise,
                    ),
                };
                self.clear_outputs();
                return Ok(());
            }
            GenerationState::GeneratingSamplePoints => {
                let samples = poisson::sample(
                    self.config.bounds,
                    self.config.min_cell_distance,
                    &mut self.rng,
                    self.config.poisson_iterations,
                );
                info!(
                    points = samples.real_count(),
                    ghosts = samples.len() - samples.real_count(),
                    "sampled points"
                );
                self.samples = Some(samples);
                return Ok(());
            }
            GenerationState::InitializingCells => {
                let samples = self
                    .samples
                    .take()
                    .ok_or_else(|| missing(stage, "sample points"))?;
                let graph = PlanarGraph::build(self.config.bounds, samples)
                    .map_err(GenerationError::DegenerateInput)?;
                let mut world = World::new(graph);
                initialize_climate(&mut world, &self.noise, &self.config.climate);
                info!(cells = world.len(), edges = world.graph.edges().len(), "built cells");
                self.world = Some(world);
                return Ok(());
            }
            _ => {}
        }

        let world = self.world.as_mut().ok_or_else(|| missing(stage, "world"))?;
        let config = &self.config;
        match stage {
            GenerationState::InitializingTectonics => {
                let plates = assign_plates(world, &self.noise, &config.tectonics, config.seed);
                info!(
                    plates,
                    continental_fraction = world.continental_fraction(),
                    "assigned plates"
                );
            }
            GenerationState::CalculatingUplift => {
                let seeded = seed_uplift(world, &self.noise, &config.tectonics);
                info!(seeded, "seeded boundary uplift");
            }
            GenerationState::PropagatingUplift => {
                let reached = propagate_uplift(
                    world,
                    &config.tectonics,
                    config.min_cell_distance,
                    config.seed,
                );
                info!(reached, "propagated uplift");
            }
            GenerationState::FindingRiverMouths => {
                let mouths = mark_river_mouths(world);
                debug!(mouths, "marked river mouths");
            }
            GenerationState::PreparingStreamGraph => {
                let drainage = build_drainage_graph(world);
                drainage.write_to(world);
                self.drainage = drainage;
            }
            GenerationState::SolvingErosion => {
                let solver = ErosionSolver::new(&config.erosion);
                let mut heights = world.heights();
                let uplift: Vec<f64> = world.cells.iter().map(|c| c.uplift).collect();
                let step = solver.step(&self.drainage, &mut heights, &uplift);
                for (cell, h) in world.cells.iter_mut().zip(heights) {
                    cell.height = h;
                }
                self.erosion_iterations += 1;
                debug!(
                    iteration = self.erosion_iterations,
                    max_delta = step.max_delta,
                    updated = step.updated,
                    "erosion step"
                );
                self.last_erosion = Some(step);
            }
            GenerationState::AdjustingTemperature => {
                apply_lapse_rate(world, &config.climate);
            }
            GenerationState::SettingBiomes => {
                let land = classify_world(world, self.classifier.as_ref());
                let grid = BiomeGrid::build(world, config.biome_grid_spacing());
                info!(land, grid_cols = grid.cols(), grid_rows = grid.rows(), "set biomes");
                self.biome_grid = Some(grid);
            }
            _ => return Err(missing(stage, "stage implementation")),
        }
        Ok(())
    }
}

/// A generator running on a worker thread.
#[derive(Debug)]
pub struct GenerationHandle {
    events: Receiver<GenerationEvent>,
    worker: JoinHandle<(Generator, Result<(), GenerationError>)>,
}

impl GenerationHandle {
    /// Progress events, ending with `Completed` or `Failed`.
    ///
    /// The channel stays open while the worker owns the generator, so stop
    /// reading at the first terminal event.
    pub fn events(&self) -> &Receiver<GenerationEvent> {
        &self.events
    }

    /// Waits for the worker and returns the generator.
    ///
    /// The generator is returned even when a stage failed, so it can be reset
    /// and rerun; the failure is in the second element.
    pub fn join(self) -> Result<(Generator, Result<(), GenerationError>), GenerationError> {
        self.worker.join().map_err(|_| GenerationError::StageFailed {
            stage: GenerationState::Failed,
            reason: "generation worker panicked".to_string(),
        })
    }
}
