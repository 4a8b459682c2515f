//! The canvas interaction states.
//!
//! ```text
//! Idle ──pointer down (pen/eraser)──► Drawing ──up / leave / cancel / tool switch──► Idle
//! Idle ──pointer down (bucket)──────► Filling ──fill applied / failed / job dropped─► Idle
//! ```
//!
//! `Drawing` owns the in-progress stroke and the pointer capture guard, so
//! leaving the state commits or drops both together. `Filling` only holds a
//! weak handle to its job; once every copy of the job is gone the fill can
//! never complete and the state no longer blocks input.

use super::capture::PointerCapture;
use crate::error::TransitionError;
use crate::layer::LayerId;
use crate::stroke::StrokeBuilder;
use std::sync::Weak;

#[derive(Debug, Default)]
pub enum InteractionState {
    /// No active gesture
    #[default]
    Idle,
    /// A pen or eraser stroke is being drawn on `layer_id`
    Drawing {
        layer_id: LayerId,
        stroke: StrokeBuilder,
        capture: PointerCapture,
    },
    /// A bucket fill on `layer_id` is compositing; further input is blocked
    Filling { layer_id: LayerId, job: Weak<()> },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::Drawing { .. } => "Drawing",
            InteractionState::Filling { .. } => "Filling",
        }
    }

    /// Gestures always start from and return to `Idle`.
    pub fn can_transition_to(&self, new_state: &InteractionState) -> bool {
        matches!(
            (self, new_state),
            (InteractionState::Idle, InteractionState::Drawing { .. })
                | (InteractionState::Idle, InteractionState::Filling { .. })
                | (InteractionState::Drawing { .. }, InteractionState::Idle)
                | (InteractionState::Filling { .. }, InteractionState::Idle)
        )
    }

    /// Moves to `new_state` and hands back the state that was left.
    pub fn transition(&mut self, new_state: InteractionState) -> Result<InteractionState, TransitionError> {
        if !self.can_transition_to(&new_state) {
            return Err(TransitionError::InvalidStateTransition {
                from: self.name(),
                to: new_state.name(),
            });
        }
        log::debug!("Interaction {} -> {}", self.name(), new_state.name());
        Ok(std::mem::replace(self, new_state))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, InteractionState::Drawing { .. })
    }

    pub fn is_filling(&self) -> bool {
        matches!(self, InteractionState::Filling { .. })
    }

    /// True in `Filling` when the fill job was dropped without completing.
    pub fn is_abandoned_fill(&self) -> bool {
        matches!(self, InteractionState::Filling { job, .. } if job.strong_count() == 0)
    }

    /// The layer the current gesture targets.
    pub fn layer_id(&self) -> Option<LayerId> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Drawing { layer_id, .. } | InteractionState::Filling { layer_id, .. } => {
                Some(*layer_id)
            }
        }
    }
}
