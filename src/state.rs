use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::{ExamStore, QuestionCatalog, SubmissionStore},
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn QuestionCatalog>,
    pub exams: Arc<dyn ExamStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub config: Config,
}

impl AppState {
    /// Uses one repository for every store.
    pub fn from_repository<R>(repository: Arc<R>, config: Config) -> Self
    where
        R: QuestionCatalog + ExamStore + SubmissionStore + 'static,
    {
        Self {
            catalog: repository.clone(),
            exams: repository.clone(),
            submissions: repository,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
