//! Time sliced build state machine.
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::{
    gradient, jump_flood, Bounds, ComputeBackend, DistanceField, FieldConfig, FieldError,
    FieldResult, FieldSample, FieldStore, Grid, MeshSnapshot, SeedGrid, VoxelJob,
};

/// Observable state of a [`Propagator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No field built yet, or the last build failed or was released.
    Idle,
    /// The voxelization job is running.
    Voxelizing,
    /// Seeds are ready to be uploaded on the next tick.
    Seeding,
    /// Jump flood steps are being dispatched, or the result is being read back.
    Propagating,
    /// A field is published and can be queried.
    Stable,
}

enum Phase {
    Idle,
    Voxelizing(VoxelJob),
    Seeding(SeedGrid),
    Propagating { step: usize, iteration: usize },
    ReadingBack,
    Stable,
}

/// What the current build is for.
#[derive(Debug, Clone)]
struct BuildTarget {
    grid: Grid,
    local_to_world: Mat4,
    seed_count: usize,
    started: web_time::Instant,
    propagation_started: Option<web_time::Instant>,
}

/// Builds distance fields for a mesh, one unit of work per [`Propagator::poll`].
///
/// ```text
/// Idle -> Voxelizing -> Seeding -> Propagating -> Stable
/// ```
///
/// - Voxelization runs on the rayon pool and is polled, never awaited.
/// - Each tick dispatches a single jump flood step, `log2(N)` ticks in total.
/// - The result is read back on the tick following the last dispatch and published
///   once it arrived. Queries see either the whole published field or a sentinel.
/// - A rebuild during a build discards the in-flight work and starts over.
pub struct Propagator<B: ComputeBackend> {
    backend: B,
    config: FieldConfig,
    initialized: bool,
    phase: Phase,
    store: Option<FieldStore<B>>,
    target: Option<BuildTarget>,
}

impl<B: ComputeBackend> Propagator<B> {
    /// Create a propagator driving `backend`. Call [`Propagator::initialize`] before building.
    pub fn new(backend: B, config: FieldConfig) -> Self {
        Self {
            backend,
            config,
            initialized: false,
            phase: Phase::Idle,
            store: None,
            target: None,
        }
    }

    /// Validate the configuration. Until this succeeds, rebuilds are refused
    /// and every query reports [`FieldSample::NotReady`].
    pub fn initialize(&mut self) -> FieldResult<()> {
        self.initialized = false;
        self.config.validate()?;
        self.initialized = true;
        log::info!(
            "[propagator] initialized: grid {:?}, threshold {}, {:?}",
            self.config.grid_size,
            self.config.threshold,
            self.config.voxelize_method
        );
        Ok(())
    }

    /// Configuration in use.
    pub const fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// The compute backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The compute backend, mutably. Volumes of the build in flight stay owned by the propagator.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Start building a field for `mesh`, cancelling any build in flight.
    ///
    /// `bounds` are expressed in the mesh local frame, `local_to_world` maps that frame to
    /// world space. The previously published field is dropped.
    pub fn rebuild_for_mesh(
        &mut self,
        mesh: MeshSnapshot,
        local_to_world: Mat4,
        bounds: Bounds,
    ) -> FieldResult<()> {
        if !self.initialized {
            log::warn!("[propagator] rebuild requested before initialize, ignored");
            return Err(FieldError::NotInitialized);
        }
        if !bounds.is_valid() {
            return Err(FieldError::InvalidBounds);
        }
        let determinant = local_to_world.determinant();
        if !local_to_world.is_finite() || determinant == 0.0 || !determinant.is_finite() {
            return Err(FieldError::SingularTransform);
        }

        match self.phase {
            Phase::Voxelizing(_) | Phase::Seeding(_) | Phase::Propagating { .. } => {
                log::warn!("[propagator] rebuild requested during a build, cancelling it");
            }
            Phase::ReadingBack => {
                log::warn!("[propagator] rebuild requested during readback, cancelling it");
            }
            Phase::Idle | Phase::Stable => {}
        }
        // a running voxelization finishes on its own, its output is discarded.
        self.release();

        let grid = Grid::from_bounds(bounds, self.config.grid_size);
        let store = FieldStore::allocate(&mut self.backend, grid.clone())
            .inspect_err(|err| log::error!("[propagator] failed to allocate volumes: {err}"))?;
        self.store = Some(store);

        let job = VoxelJob::spawn(
            mesh,
            grid.clone(),
            self.config.threshold,
            self.config.voxelize_method,
        );
        self.phase = Phase::Voxelizing(job);
        self.target = Some(BuildTarget {
            grid,
            local_to_world,
            seed_count: 0,
            started: web_time::Instant::now(),
            propagation_started: None,
        });
        Ok(())
    }

    /// Advance the build by one tick. Never blocks.
    pub fn poll(&mut self) -> BuildState {
        let phase = core::mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match self.advance(phase) {
            Ok(phase) => phase,
            Err(err) => {
                log::error!("[propagator] build failed: {err}");
                self.release();
                Phase::Idle
            }
        };
        self.state()
    }

    fn advance(&mut self, phase: Phase) -> FieldResult<Phase> {
        let (Some(store), Some(target)) = (self.store.as_mut(), self.target.as_mut()) else {
            return Ok(Phase::Idle);
        };

        match phase {
            Phase::Idle => Ok(Phase::Idle),
            Phase::Stable => Ok(Phase::Stable),
            Phase::Voxelizing(mut job) => Ok(job
                .try_take()
                .map_or(Phase::Voxelizing(job), Phase::Seeding)),
            Phase::Seeding(seeds) => {
                store.upload_seeds(&mut self.backend, &seeds)?;
                target.seed_count = seeds.seed_count();
                target.propagation_started = Some(web_time::Instant::now());

                let size = target.grid.get_cell_count();
                let step = jump_flood::initial_step(size);
                log::info!(
                    "[propagator] propagating {} seeds, initial step {}, {} iterations",
                    seeds.seed_count(),
                    step,
                    jump_flood::iteration_count(size)
                );
                drop(seeds);

                Self::dispatch(store, &mut self.backend, step, 0)
            }
            Phase::Propagating { step, iteration } => {
                Self::dispatch(store, &mut self.backend, step, iteration)
            }
            Phase::ReadingBack => match store.poll_readback(&mut self.backend) {
                None => Ok(Phase::ReadingBack),
                Some(cells) => {
                    let field = DistanceField::new(
                        target.grid.clone(),
                        target.local_to_world,
                        cells?,
                        self.config.sample_mode,
                    );
                    store.publish(field);

                    let propagation_ms = target
                        .propagation_started
                        .map_or(0.0, |start| start.elapsed().as_secs_f64() * 1000.0);
                    log::info!(
                        "[propagator] field ready: {} seeds, propagation {:.3}ms, total {:.3}ms",
                        target.seed_count,
                        propagation_ms,
                        target.started.elapsed().as_secs_f64() * 1000.0
                    );
                    Ok(Phase::Stable)
                }
            },
        }
    }

    /// Dispatch `step` if any is left, otherwise request the readback.
    fn dispatch(
        store: &mut FieldStore<B>,
        backend: &mut B,
        step: usize,
        iteration: usize,
    ) -> FieldResult<Phase> {
        if step == 0 {
            log::debug!("[propagator] {iteration} steps dispatched, reading back");
            store.request_readback(backend)?;
            return Ok(Phase::ReadingBack);
        }

        log::debug!("[propagator] jump flood step {step} (iteration {iteration})");
        store.jump_flood_step(backend, step)?;
        Ok(Phase::Propagating {
            step: step / 2,
            iteration: iteration + 1,
        })
    }

    /// Current state.
    pub const fn state(&self) -> BuildState {
        match self.phase {
            Phase::Idle => BuildState::Idle,
            Phase::Voxelizing(_) => BuildState::Voxelizing,
            Phase::Seeding(_) => BuildState::Seeding,
            Phase::Propagating { .. } | Phase::ReadingBack => BuildState::Propagating,
            Phase::Stable => BuildState::Stable,
        }
    }

    /// Whether a field is published and queries return distances.
    pub fn is_ready(&self) -> bool {
        self.initialized && matches!(self.phase, Phase::Stable) && self.field().is_some()
    }

    /// The published field, while stable.
    pub fn field(&self) -> Option<Arc<DistanceField>> {
        match self.phase {
            Phase::Stable => self.store.as_ref()?.stable().cloned(),
            _ => None,
        }
    }

    /// Sample the published field, [`FieldSample::NotReady`] when there is none.
    pub fn sample(&self, world_point: Vec3) -> FieldSample {
        self.field()
            .map_or(FieldSample::NotReady, |field| field.sample(world_point))
    }

    /// Normal of the published field, up when there is none.
    pub fn estimate_normal(&self, world_point: Vec3) -> Vec3 {
        self.field()
            .map_or(gradient::FALLBACK_NORMAL, |field| {
                field.estimate_normal(world_point)
            })
    }

    /// Cancel the build in flight, drop the published field and free the volumes.
    /// Safe to call in any state.
    pub fn release(&mut self) {
        self.phase = Phase::Idle;
        self.target = None;
        if let Some(store) = self.store.take() {
            store.release(&mut self.backend);
        }
    }
}

impl<B: ComputeBackend> Drop for Propagator<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: ComputeBackend> core::fmt::Debug for Propagator<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Propagator")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("state", &self.state())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
