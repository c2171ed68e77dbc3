//! In-process API facade over a deterministic run, with optional SQLite
//! persistence and an HTTP control surface.

mod persistence;
mod server;

use std::path::Path;

use contracts::{Event, RunConfig, RunStatus, Snapshot};
use process_core::world::ProcessWorld;
use process_core::SimError;

pub use persistence::{PersistedRunSummary, PersistenceError, SqliteRunStore};
pub use server::{serve, ServerError};

#[derive(Debug)]
struct PersistenceState {
    store: SqliteRunStore,
    persisted_event_count: usize,
    last_snapshot_tick: Option<u64>,
}

#[derive(Debug)]
pub struct EngineApi {
    engine: ProcessWorld,
    persistence: Option<PersistenceState>,
    last_persistence_error: Option<String>,
}

impl EngineApi {
    pub fn from_config(config: RunConfig) -> Result<Self, SimError> {
        Ok(Self {
            engine: ProcessWorld::new(config)?,
            persistence: None,
            last_persistence_error: None,
        })
    }

    pub fn config(&self) -> &RunConfig {
        self.engine.config()
    }

    pub fn status(&self) -> RunStatus {
        self.engine.status().clone()
    }

    pub fn events(&self) -> &[Event] {
        self.engine.events()
    }

    pub fn snapshot(&self) -> Result<Snapshot, SimError> {
        self.engine.snapshot()
    }

    pub fn start(&mut self) -> RunStatus {
        self.engine.start();
        self.status()
    }

    pub fn pause(&mut self) -> RunStatus {
        self.engine.pause();
        self.status()
    }

    /// Step up to `steps` ticks, flushing persistence afterwards. Persistence
    /// failures do not fail the step; they are captured for inspection.
    pub fn step(&mut self, steps: u64) -> Result<(RunStatus, u64), SimError> {
        let committed = self.engine.step_n(steps)?;
        self.flush_persistence();
        Ok((self.status(), committed))
    }

    pub fn run_to_tick(&mut self, tick: u64) -> Result<(RunStatus, u64), SimError> {
        let committed = self.engine.run_to_tick(tick)?;
        self.flush_persistence();
        Ok((self.status(), committed))
    }

    // -- persistence ---------------------------------------------------------

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let store = SqliteRunStore::open(path)?;
        self.persistence = Some(PersistenceState {
            store,
            persisted_event_count: 0,
            last_snapshot_tick: None,
        });
        Ok(())
    }

    /// Create (or, with `replace_existing_run`, recreate) the run's rows and
    /// write the bootstrap snapshot.
    pub fn initialize_run_storage(
        &mut self,
        replace_existing_run: bool,
    ) -> Result<(), PersistenceError> {
        let bootstrap = self
            .engine
            .snapshot()
            .map_err(|err| PersistenceError::Engine(err.to_string()))?;

        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let run_id = self.engine.config().run_id.clone();
        if state.store.run_exists(&run_id)? {
            if replace_existing_run {
                state.store.delete_run(&run_id)?;
                state.persisted_event_count = 0;
                state.last_snapshot_tick = None;
            } else {
                return Err(PersistenceError::RunAlreadyExists(run_id));
            }
        }

        state
            .store
            .persist_delta(self.engine.config(), self.engine.status(), &[], Some(&bootstrap))?;
        state.last_snapshot_tick = Some(bootstrap.tick);
        self.last_persistence_error = None;
        Ok(())
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    fn flush_persistence(&mut self) {
        if self.persistence.is_none() {
            return;
        }
        if let Err(err) = self.flush_persistence_checked() {
            self.last_persistence_error = Some(err.to_string());
        }
    }

    fn flush_persistence_checked(&mut self) -> Result<(), PersistenceError> {
        let current_tick = self.engine.status().current_tick;
        let cadence = self.engine.config().snapshot_every_ticks.max(1);

        let snapshot_due = {
            let Some(state) = self.persistence.as_ref() else {
                return Err(PersistenceError::NotAttached);
            };
            (current_tick % cadence == 0 || self.engine.status().is_complete())
                && state.last_snapshot_tick != Some(current_tick)
        };
        let snapshot = if snapshot_due {
            Some(
                self.engine
                    .snapshot()
                    .map_err(|err| PersistenceError::Engine(err.to_string()))?,
            )
        } else {
            None
        };

        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };
        let new_events = &self.engine.events()[state.persisted_event_count..];
        state.store.persist_delta(
            self.engine.config(),
            self.engine.status(),
            new_events,
            snapshot.as_ref(),
        )?;
        state.persisted_event_count = self.engine.events().len();
        if let Some(snapshot) = snapshot {
            state.last_snapshot_tick = Some(snapshot.tick);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_steps_and_reports_status() {
        let mut api = EngineApi::from_config(RunConfig {
            agent_count: 5,
            max_ticks: 10,
            ..RunConfig::default()
        })
        .expect("api");

        let (status, committed) = api.step(4).expect("step");
        assert_eq!(committed, 4);
        assert_eq!(status.current_tick, 4);

        let (status, committed) = api.run_to_tick(10).expect("run");
        assert_eq!(committed, 6);
        assert!(status.is_complete());
    }

    #[test]
    fn initialize_without_attached_store_is_rejected() {
        let mut api = EngineApi::from_config(RunConfig::default()).expect("api");
        assert!(matches!(
            api.initialize_run_storage(false),
            Err(PersistenceError::NotAttached)
        ));
    }

    #[test]
    fn persistence_flushes_events_and_cadence_snapshots() {
        let dir = std::env::temp_dir().join(format!(
            "process_api_test_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("tempdir");
        let path = dir.join("facade_flush.sqlite");
        let _ = std::fs::remove_file(&path);

        let mut api = EngineApi::from_config(RunConfig {
            agent_count: 8,
            max_ticks: 24,
            snapshot_every_ticks: 12,
            ..RunConfig::default()
        })
        .expect("api");
        api.attach_sqlite_store(&path).expect("attach");
        api.initialize_run_storage(true).expect("initialize");

        api.run_to_tick(24).expect("run");
        assert_eq!(api.last_persistence_error(), None);

        let store = SqliteRunStore::open(&path).expect("reopen");
        let summaries = store.list_runs().expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].current_tick, 24);
        assert_eq!(summaries[0].event_count, api.events().len() as u64);
        let latest = store
            .latest_snapshot(&summaries[0].run_id)
            .expect("snapshot")
            .expect("present");
        assert_eq!(latest.tick, 24);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn replacing_an_existing_run_requires_the_flag() {
        let dir = std::env::temp_dir().join(format!(
            "process_api_test_replace_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("tempdir");
        let path = dir.join("facade_replace.sqlite");
        let _ = std::fs::remove_file(&path);

        let config = RunConfig {
            agent_count: 3,
            max_ticks: 6,
            ..RunConfig::default()
        };
        let mut first = EngineApi::from_config(config.clone()).expect("api");
        first.attach_sqlite_store(&path).expect("attach");
        first.initialize_run_storage(true).expect("initialize");

        let mut second = EngineApi::from_config(config).expect("api");
        second.attach_sqlite_store(&path).expect("attach");
        assert!(matches!(
            second.initialize_run_storage(false),
            Err(PersistenceError::RunAlreadyExists(_))
        ));
        second.initialize_run_storage(true).expect("replace");

        let _ = std::fs::remove_file(&path);
    }
}
