use super::super::World;
use crate::agent::AgentSummary;
use crate::stats::StatsSink;

impl World {
    /// Purge this turn's pending removals, notify `sink`, and check for the end.
    ///
    /// Purging stops as soon as one agent is left. That agent wins even if it
    /// was itself marked this turn; its mark is dropped and it keeps its balance.
    pub(in crate::world) fn step_cleanup_phase<S: StatsSink + ?Sized>(&mut self, sink: &mut S) {
        let pending = std::mem::take(&mut self.pending);
        let mut removed: Vec<AgentSummary> = Vec::with_capacity(pending.len());

        for id in pending {
            let idx = id.index();
            self.pending_flags[idx] = false;
            if self.living.len() <= 1 {
                tracing::debug!(timestep = self.timestep, agent = %id, "last agent spared from removal");
                continue;
            }
            self.locations[idx] = None;
            self.living.retain(|&other| other != id);

            let agent = &mut self.agents[idx];
            agent.record_time_alive(self.timestep);
            // Starved agents may be overdrawn; writing the debt off keeps the
            // resource ledger balanced.
            self.metabolized += agent.resources();
            removed.push(agent.summary());
        }

        sink.on_removals(self.timestep, &removed);

        if let Some(outcome) = self.check_termination() {
            // Reported at the timestep of the turn that ended the run.
            let survivors: Vec<AgentSummary> = self.agents().map(|a| a.summary()).collect();
            sink.on_finish(self.timestep, outcome, &survivors);
        }
    }
}
