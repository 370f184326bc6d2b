//! Lifecycle management for odometry components

use crate::error::LifecycleError;
use log::info;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send {
    /// Configure the node
    fn on_configure(&mut self) -> Result<(), LifecycleError>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<(), LifecycleError>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<(), LifecycleError>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<(), LifecycleError>;

    /// Shut the node down for good
    fn on_shutdown(&mut self) -> Result<(), LifecycleError>;
}

/// Base implementation for lifecycle nodes
#[derive(Debug, Clone)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
    Finalized,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    /// Move to `to` if the node is currently in `from`
    pub fn transition(
        &mut self,
        transition: &'static str,
        from: State,
        to: State,
    ) -> Result<(), LifecycleError> {
        if self.state != from {
            return Err(LifecycleError::InvalidTransition {
                node: self.name.clone(),
                transition,
                from: self.state,
            });
        }
        info!("{}: {} ({:?} -> {:?})", self.name, transition, from, to);
        self.state = to;
        Ok(())
    }

    /// Finalize from any non-finalized state
    pub fn finalize(&mut self) -> Result<(), LifecycleError> {
        if self.state == State::Finalized {
            return Err(LifecycleError::InvalidTransition {
                node: self.name.clone(),
                transition: "shutdown",
                from: self.state,
            });
        }
        info!("{}: shutdown ({:?} -> Finalized)", self.name, self.state);
        self.state = State::Finalized;
        Ok(())
    }
}
