// src/state.rs

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use axum::extract::FromRef;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::Config,
    engine::{ReportGateway, SessionContext, SessionHandle},
    runner::TestRunner,
    store::ExamStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub sessions: SessionRegistry,
    pub session_ctx: SessionContext,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ExamStore>, runner: Arc<dyn TestRunner>) -> Self {
        let session_ctx = SessionContext {
            gateway: ReportGateway::new(store.clone()),
            runner,
            tick_period: config.tick_period,
            idle_timeout: config.session_idle_timeout,
        };
        Self {
            store,
            sessions: SessionRegistry::default(),
            session_ctx,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Live sessions by id. Removing a session drops its handle, which stops it.
/// Sessions that closed on their own are dropped by `sweep`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn insert(&self, handle: SessionHandle) {
        if let Ok(mut sessions) = self.inner.write() {
            sessions.retain(|_, existing| !existing.is_closed());
            sessions.insert(handle.id(), handle);
        }
    }

    /// Closed sessions are reported as missing.
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.inner
            .read()
            .ok()?
            .get(id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Removes every closed session and returns how many were removed.
    pub fn sweep(&self) -> usize {
        match self.inner.write() {
            Ok(mut sessions) => {
                let before = sessions.len();
                sessions.retain(|_, handle| !handle.is_closed());
                before - sessions.len()
            }
            Err(_) => 0,
        }
    }

    /// Sweeps the registry every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = registry.sweep();
                if removed > 0 {
                    tracing::debug!("Removed {} closed sessions", removed);
                }
            }
        })
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.inner.write().ok()?.remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            exam::{ExamType, NewExam},
            report::Learner,
        },
        runner::UnavailableRunner,
        store::MemoryStore,
    };

    #[tokio::test(start_paused = true)]
    async fn test_finished_and_idle_sessions_leave_the_registry() {
        let store = Arc::new(MemoryStore::new());
        let exam = store
            .create_exam(NewExam {
                name: "Empty".to_string(),
                category: "rust".to_string(),
                exam_type: ExamType::Quiz,
                questions: vec![],
                duration: 0,
                passing_marks: 0,
                total_marks: 0,
            })
            .await
            .unwrap();
        let ctx = SessionContext {
            gateway: ReportGateway::new(store.clone()),
            runner: Arc::new(UnavailableRunner),
            tick_period: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(60),
        };
        let registry = SessionRegistry::default();

        for learner_id in 0..50 {
            let learner = Learner { id: learner_id, name: "l".to_string(), is_admin: false };
            let handle = SessionHandle::spawn(ctx.clone(), exam.clone(), learner);
            // Half finish their attempt, half never leave the instructions.
            if learner_id % 2 == 0 {
                handle.begin().await.unwrap();
            }
            registry.insert(handle);
        }
        assert_eq!(registry.len(), 50);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(registry.sweep(), 50);
        assert!(registry.is_empty());
        assert_eq!(store.list_reports().await.unwrap().len(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_is_not_returned() {
        let store = Arc::new(MemoryStore::new());
        let exam = store
            .create_exam(NewExam {
                name: "Empty".to_string(),
                category: "rust".to_string(),
                exam_type: ExamType::Quiz,
                questions: vec![],
                duration: 10,
                passing_marks: 0,
                total_marks: 0,
            })
            .await
            .unwrap();
        let ctx = SessionContext {
            gateway: ReportGateway::new(store.clone()),
            runner: Arc::new(UnavailableRunner),
            tick_period: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(5),
        };
        let registry = SessionRegistry::default();
        let learner = Learner { id: 1, name: "l".to_string(), is_admin: false };
        let handle = SessionHandle::spawn(ctx, exam, learner);
        let id = handle.id();
        registry.insert(handle);

        assert!(registry.get(&id).is_some());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(registry.get(&id).is_none());
    }
}
