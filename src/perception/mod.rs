//! Perception module: encoder intake and dead-reckoning odometry
pub mod odometry;
pub mod sensors;

use self::odometry::{BaselinePolicy, EstimatorState, OdometryEstimator, PoseEstimate};
use self::sensors::EncoderSample;
use crate::common::types::Stamp;
use crate::error::{ErrorKind, LifecycleError, OdometryError};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use log::{debug, info, warn};

/// Counters for every sample the stack has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub accepted: u64,
    pub rejected_geometry: u64,
    pub rejected_invalid: u64,
    pub resynchronized: u64,
    /// Samples that arrived while the stack was not active
    pub dropped_inactive: u64,
}

impl SampleStats {
    pub fn total(&self) -> u64 {
        self.accepted
            + self.rejected_geometry
            + self.rejected_invalid
            + self.resynchronized
            + self.dropped_inactive
    }

    fn record_fault(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::DegenerateGeometry => self.rejected_geometry += 1,
            ErrorKind::InvalidSample => self.rejected_invalid += 1,
            ErrorKind::EncoderDiscontinuity => self.resynchronized += 1,
        }
    }
}

/// Reason a sample produced no estimate
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Odometry(#[from] OdometryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Odometry stack for the robot
///
/// Owns the estimator and serialises all access to it. The estimator is
/// created on configure, so a cleanup followed by a new configure starts
/// again from the origin. Sample counters are cleared on cleanup only.
pub struct OdometryStack {
    base: LifecycleNodeBase,
    policy: BaselinePolicy,
    estimator: Option<OdometryEstimator>,
    stats: SampleStats,
    clock: Box<dyn Fn() -> Stamp + Send>,
}

impl OdometryStack {
    /// Create a new odometry stack reading construction time from `clock`
    pub fn new<C>(policy: BaselinePolicy, clock: C) -> Self
    where
        C: Fn() -> Stamp + Send + 'static,
    {
        OdometryStack {
            base: LifecycleNodeBase::new("odometry_stack"),
            policy,
            estimator: None,
            stats: SampleStats::default(),
            clock: Box::new(clock),
        }
    }

    pub fn state(&self) -> State {
        self.base.get_state()
    }

    pub fn stats(&self) -> SampleStats {
        self.stats
    }

    /// Current estimator state, if configured
    pub fn estimator_state(&self) -> Option<&EstimatorState> {
        self.estimator.as_ref().map(|e| e.state())
    }

    /// Parse a raw feed message and integrate it
    pub fn process_fields(
        &mut self,
        fields: &[f64],
        timestamp: Stamp,
    ) -> Result<PoseEstimate, ProcessError> {
        match EncoderSample::from_fields(fields, timestamp) {
            Ok(sample) => self.process(&sample),
            Err(fault) => {
                if !self.base.is_active() {
                    return Err(self.drop_inactive());
                }
                let err = OdometryError::from(fault);
                self.stats.record_fault(err.kind());
                warn!("Rejected encoder message: {}", err);
                Err(err.into())
            }
        }
    }

    /// Integrate one sample
    pub fn process(&mut self, sample: &EncoderSample) -> Result<PoseEstimate, ProcessError> {
        if !self.base.is_active() {
            return Err(self.drop_inactive());
        }
        let result = match self.estimator.as_mut() {
            Some(estimator) => estimator.update(sample),
            None => return Err(self.drop_inactive()),
        };

        match result {
            Ok(estimate) => {
                self.stats.accepted += 1;
                debug!(
                    "Odometry: x={:.3}, y={:.3}, heading={:.3}",
                    estimate.x, estimate.y, estimate.heading
                );
                Ok(estimate)
            }
            Err(err) => {
                self.stats.record_fault(err.kind());
                warn!("Encoder sample not integrated: {}", err);
                Err(err.into())
            }
        }
    }

    fn drop_inactive(&mut self) -> ProcessError {
        self.stats.dropped_inactive += 1;
        LifecycleError::NotActive {
            node: self.base.name.clone(),
            state: self.base.get_state(),
        }
        .into()
    }
}

impl LifecycleNode for OdometryStack {
    fn on_configure(&mut self) -> Result<(), LifecycleError> {
        self.base
            .transition("configure", State::Unconfigured, State::Inactive)?;
        self.estimator = Some(OdometryEstimator::new((self.clock)(), self.policy));
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), LifecycleError> {
        self.base
            .transition("activate", State::Inactive, State::Active)
    }

    fn on_deactivate(&mut self) -> Result<(), LifecycleError> {
        self.base
            .transition("deactivate", State::Active, State::Inactive)?;
        let stats = self.stats;
        info!(
            "Samples: {} accepted, {} zero wheel base, {} invalid, {} resynchronised, {} dropped while inactive",
            stats.accepted,
            stats.rejected_geometry,
            stats.rejected_invalid,
            stats.resynchronized,
            stats.dropped_inactive
        );
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<(), LifecycleError> {
        self.base
            .transition("cleanup", State::Inactive, State::Unconfigured)?;
        self.estimator = None;
        self.stats = SampleStats::default();
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<(), LifecycleError> {
        self.base.finalize()?;
        self.estimator = None;
        Ok(())
    }
}
