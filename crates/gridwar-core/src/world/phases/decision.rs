use super::super::{SimError, World};
use crate::agent::AgentId;
use crate::grid::Offset;

impl World {
    /// Ask `id` for its move given its live window onto the grid.
    pub(in crate::world) fn step_decision_phase(&mut self, id: AgentId) -> Result<Offset, SimError> {
        let center = self.location_of(id)?;
        let agent = self
            .agents
            .get_mut(id.index())
            .ok_or(SimError::UnknownAgent { agent: id })?;
        let view = self
            .grid
            .view(&self.resources, center, agent.fov_radius());
        agent.decide_move(&view)
    }
}
