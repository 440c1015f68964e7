// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Component and action registries.
//!
//! Every check runs before the first mutation, so a failed call leaves both
//! registries and the graph untouched.

use super::Pipeline;
use crate::core::action::ActionHandle;
use crate::core::component::Component;
use crate::core::error::{PipelineError, Result};
use crate::core::pubsub::Notification;
use crate::core::state::ReadinessState;

impl Pipeline {
    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn has_component(&self, component: &Component) -> bool {
        self.components.contains(component)
    }

    pub(super) fn require_registered(&self, component: &Component) -> Result<()> {
        if !self.has_component(component) {
            return Err(PipelineError::new(format!(
                "{} isn't handled by this pipeline",
                component
            )));
        }
        Ok(())
    }

    /// Register components. Only consumers may join a Paused or Playing
    /// pipeline.
    pub fn add_components(&mut self, components: &[Component]) -> Result<()> {
        if self.cached_state.is_active() {
            if let Some(producer) = components.iter().find(|c| !c.is_consumer()) {
                return Err(PipelineError::new(format!(
                    "Pipeline is {}, can not add producer {}",
                    self.cached_state, producer
                )));
            }
        }
        if let Some(foreign) = components
            .iter()
            .find(|c| c.pipeline_binding().is_some_and(|owner| owner != self.id))
        {
            return Err(PipelineError::new(format!(
                "{} is already used by another pipeline",
                foreign
            )));
        }

        for component in components {
            if self.has_component(component) {
                continue;
            }
            component.set_pipeline_binding(Some(self.id));
            self.components.push(component.clone());
            tracing::debug!("[Registry] Added {}", component);
            self.emit(Notification::ComponentAdded {
                component: component.id(),
            });
        }
        Ok(())
    }

    /// Unregister components, tearing down everything built for them.
    pub fn remove_components(&mut self, components: &[Component]) -> Result<()> {
        self.require_topology_changes("remove components")?;
        for component in components {
            if let Some(action) = self
                .actions
                .iter()
                .find(|a| a.is_active() && a.references(component))
            {
                return Err(PipelineError::new(format!(
                    "{} is used by active action {}",
                    component,
                    action.id()
                )));
            }
        }

        for component in components {
            if self.has_component(component) {
                self.remove_component(component);
            }
        }
        Ok(())
    }

    fn remove_component(&mut self, component: &Component) {
        for action in &self.actions {
            let mut guard = action.lock();
            if guard.producers().contains(component) {
                guard.remove_producers(component);
            }
            if guard.consumers().contains(component) {
                guard.remove_consumers(component);
            }
        }

        self.teardown_component_nodes(component);

        self.components.retain(|c| c != component);
        component.set_pipeline_binding(None);
        tracing::debug!("[Registry] Removed {}", component);
        self.emit(Notification::ComponentRemoved {
            component: component.id(),
        });
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    pub fn actions(&self) -> &[ActionHandle] {
        &self.actions
    }

    pub fn add_action(&mut self, action: &ActionHandle) -> Result<()> {
        if let Some(owner) = action.pipeline_binding() {
            if owner != self.id {
                return Err(PipelineError::new(format!(
                    "Action {} already used by {}",
                    action.id(),
                    owner
                )));
            }
        }
        if self.actions.contains(action) {
            return Ok(());
        }

        action.set_pipeline_binding(Some(self.id));
        self.actions.push(action.clone());
        tracing::debug!("[Registry] Added action {} ({})", action.id(), action.type_name());
        self.emit(Notification::ActionAdded {
            action: action.id(),
        });
        Ok(())
    }

    /// Return the registered action of the same concrete type as `action`,
    /// or register `action`.
    pub fn set_action(&mut self, action: &ActionHandle) -> Result<ActionHandle> {
        if let Some(existing) = self
            .actions
            .iter()
            .find(|a| a.type_id() == action.type_id())
        {
            return Ok(existing.clone());
        }
        self.add_action(action)?;
        Ok(action.clone())
    }

    pub fn remove_action(&mut self, action: &ActionHandle) -> Result<()> {
        if !self.actions.contains(action) {
            return Ok(());
        }
        if action.is_active() && self.cached_state.is_active() {
            return Err(PipelineError::new(format!(
                "Can't remove active action {} while {}",
                action.id(),
                self.cached_state
            )));
        }
        action.lock().unbind_pipeline().map_err(|e| {
            PipelineError::new(format!("Couldn't unbind action {}: {}", action.id(), e))
        })?;

        action.set_pipeline_binding(None);
        self.actions.retain(|a| a != action);
        tracing::debug!("[Registry] Removed action {}", action.id());
        self.emit(Notification::ActionRemoved {
            action: action.id(),
        });
        Ok(())
    }

    /// Stop the pipeline and drop every action and component.
    ///
    /// Active actions are deactivated before removal.
    pub fn release(&mut self) -> Result<()> {
        tracing::info!("[Pipeline] Releasing {}", self.id);
        self.poller.disable();
        self.set_state(ReadinessState::Null)?;
        if self.cached_state != ReadinessState::Null {
            return Err(PipelineError::new(format!(
                "Pipeline did not reach Null (still {})",
                self.cached_state
            )));
        }

        for action in self.actions.clone() {
            if action.is_active() {
                action.lock().deactivate().map_err(|e| {
                    PipelineError::new(format!(
                        "Couldn't deactivate action {}: {}",
                        action.id(),
                        e
                    ))
                })?;
            }
            self.remove_action(&action)?;
        }

        let components = self.components.clone();
        self.remove_components(&components)
    }
}
