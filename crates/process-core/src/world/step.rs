use super::*;

use crate::behavior;
use crate::evolution;

impl ProcessWorld {
    pub fn start(&mut self) {
        if !self.status.is_complete() {
            self.status.mode = RunMode::Running;
        }
    }

    pub fn pause(&mut self) {
        self.status.mode = RunMode::Paused;
    }

    /// Advance one tick: every agent, in creation order, drifts its features
    /// and runs its stage behavior. Returns `Ok(false)` once the run is
    /// complete; a `SimError` means a topology/logic mismatch and poisons the
    /// run before the tick commits.
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.status.is_complete() {
            self.status.mode = RunMode::Paused;
            return Ok(false);
        }
        self.status.mode = RunMode::Running;
        let tick = self.status.current_tick.saturating_add(1);
        self.status.current_tick = tick;
        self.ctx.tick = tick;

        let mut sequence_in_tick = 0_u64;
        for index in 0..self.agents.len() {
            let mut agent = self.agents[index].clone();
            evolution::advance(&mut agent.features, agent.recommendation.as_mut(), tick);
            let outcome = behavior::run_stage(&mut agent, &mut self.ctx)?;
            agent.node = outcome.next_node;
            for stage_event in outcome.events {
                self.push_event(tick, &mut sequence_in_tick, agent.id, stage_event);
            }
            self.agents[index] = agent;
        }

        self.refresh_tallies()?;
        self.state_hash = mix_state_hash(self.state_hash, tick, sequence_in_tick);

        if self.status.is_complete() {
            self.status.mode = RunMode::Paused;
        }
        Ok(true)
    }

    /// Step up to `n` ticks; returns the number committed.
    pub fn step_n(&mut self, n: u64) -> Result<u64, SimError> {
        let mut committed = 0_u64;
        for _ in 0..n {
            if !self.step()? {
                break;
            }
            committed += 1;
        }
        Ok(committed)
    }

    /// Step until `tick` is reached or the run completes.
    pub fn run_to_tick(&mut self, tick: u64) -> Result<u64, SimError> {
        let mut committed = 0_u64;
        while self.status.current_tick < tick {
            if !self.step()? {
                break;
            }
            committed += 1;
        }
        Ok(committed)
    }

    fn refresh_tallies(&mut self) -> Result<(), SimError> {
        let mut tallies = RunTallies::default();
        for agent in &self.agents {
            let kind = self.ctx.graph.kind_of(agent.node)?;
            match kind {
                StageKind::ReceivingBenefits => tallies.receiving += 1,
                StageKind::Idle => tallies.idle += 1,
                _ => {}
            }
            match agent.status {
                contracts::AgentStatus::Accepted => {
                    tallies.accepted += 1;
                    if kind == StageKind::ReceivingBenefits {
                        tallies.benefits_outlay += agent.outcome;
                    }
                }
                contracts::AgentStatus::Rejected => tallies.rejected += 1,
                contracts::AgentStatus::Unset => {}
            }
            tallies.investigations_total += agent.investigations;
            tallies.model_investigations_total += agent.model_investigations;
        }
        self.tallies = tallies;
        Ok(())
    }
}
