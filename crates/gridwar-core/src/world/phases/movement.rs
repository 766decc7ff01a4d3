use super::super::{SimError, TurnEvent, World};
use crate::agent::AgentId;
use crate::grid::{Cell, Offset, Position};

impl World {
    /// Move `id` one step by `offset`, collecting or fighting whatever is there.
    ///
    /// The mover's old cell is always vacated, whoever wins.
    pub(in crate::world) fn step_movement_phase(
        &mut self,
        id: AgentId,
        offset: Offset,
    ) -> Result<(), SimError> {
        let from = self.location_of(id)?;
        let occupant = self.grid.get(from).unwrap_or(Cell::Barrier);
        if occupant != Cell::Agent(id) {
            return Err(SimError::LocationMismatch {
                agent: id,
                expected: from,
                found: occupant,
            });
        }
        let to = from
            .checked_offset(offset, self.grid.size())
            .ok_or(SimError::OutOfBounds {
                agent: id,
                from,
                offset,
            })?;

        match self.grid.get(to).unwrap_or(Cell::Barrier) {
            Cell::Empty => {
                self.relocate(id, to);
                tracing::debug!(timestep = self.timestep, agent = %id, from = %from, to = %to, "moved");
                self.record_event(TurnEvent::Moved {
                    timestep: self.timestep,
                    agent: id,
                    from,
                    to,
                });
            }
            Cell::Resource(rid) => {
                let amount = self.resources.remove(rid).map_or(0, |r| r.amount());
                self.agent_mut(id)?.add_resources(amount);
                self.relocate(id, to);
                tracing::debug!(timestep = self.timestep, agent = %id, at = %to, amount, "collected resource");
                self.record_event(TurnEvent::Collected {
                    timestep: self.timestep,
                    agent: id,
                    at: to,
                    amount,
                });
            }
            Cell::Agent(defender) => self.resolve_fight(id, defender, to)?,
            Cell::Barrier => {
                return Err(SimError::OutOfBounds {
                    agent: id,
                    from,
                    offset,
                })
            }
        }

        self.grid.clear(from);
        Ok(())
    }

    /// The attacker must hold strictly more resources to win; ties go to the defender.
    /// The winner takes the loser's whole balance and ends up on `at`.
    fn resolve_fight(
        &mut self,
        attacker: AgentId,
        defender: AgentId,
        at: Position,
    ) -> Result<(), SimError> {
        let attacker_resources = self.agent_mut(attacker)?.resources();
        let defender_resources = self.agent_mut(defender)?.resources();
        let (winner, loser) = if attacker_resources > defender_resources {
            (attacker, defender)
        } else {
            (defender, attacker)
        };

        let spoils = self.agent_mut(loser)?.surrender_resources();
        self.agent_mut(winner)?.add_resources(spoils);
        self.locations[loser.index()] = None;
        self.relocate(winner, at);
        self.mark_pending(loser);

        tracing::debug!(
            timestep = self.timestep,
            attacker = %attacker,
            defender = %defender,
            winner = %winner,
            spoils,
            "fight"
        );
        self.record_event(TurnEvent::Fought {
            timestep: self.timestep,
            attacker,
            defender,
            winner,
            spoils,
            at,
        });
        Ok(())
    }

    fn relocate(&mut self, id: AgentId, to: Position) {
        self.grid.set(to, Cell::Agent(id));
        self.locations[id.index()] = Some(to);
    }
}
