use super::*;

use contracts::Snapshot;

impl ProcessWorld {
    /// Full-population snapshot at the current tick.
    pub fn snapshot(&self) -> Result<Snapshot, SimError> {
        let mut agents = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let kind = self.ctx.graph.kind_of(agent.node)?;
            agents.push(agent.to_snapshot(kind));
        }
        Ok(Snapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: self.config.run_id.clone(),
            tick: self.status.current_tick,
            replay_hash: self.replay_hash,
            tallies: self.tallies,
            agents,
        })
    }
}
