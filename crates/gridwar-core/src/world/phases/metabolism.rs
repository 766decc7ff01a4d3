use super::super::{SimError, TurnEvent, World};
use crate::agent::AgentId;
use crate::grid::Cell;

impl World {
    /// Charge `id` its metabolic cost.
    ///
    /// Returns `Ok(false)` when the agent starved: it is marked for removal and
    /// its cell is vacated, so it takes no further part in this turn.
    pub(in crate::world) fn step_metabolism_phase(&mut self, id: AgentId) -> Result<bool, SimError> {
        let agent = self.agent_mut(id)?;
        let rate = agent.metabolic_rate();
        let remaining = agent.update_resources();
        self.metabolized += rate;
        if remaining > 0 {
            return Ok(true);
        }

        let at = self.location_of(id)?;
        let found = self.grid.get(at).unwrap_or(Cell::Barrier);
        if found != Cell::Agent(id) {
            return Err(SimError::LocationMismatch {
                agent: id,
                expected: at,
                found,
            });
        }
        self.grid.clear(at);
        self.locations[id.index()] = None;
        self.mark_pending(id);
        tracing::debug!(timestep = self.timestep, agent = %id, at = %at, "starved");
        self.record_event(TurnEvent::Starved {
            timestep: self.timestep,
            agent: id,
            at,
        });
        Ok(false)
    }
}
