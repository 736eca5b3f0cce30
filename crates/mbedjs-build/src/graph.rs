//! Stage graph execution.
//!
//! A [`TaskGraph`] holds named stages, each with the stages it must wait for.
//! Running the graph starts every stage whose prerequisites have all
//! succeeded, concurrently, and hands each stage the outputs of its
//! prerequisites. After the first failure no further stage is started;
//! stages already running are allowed to finish, then the failure is
//! returned.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{BuildError, GraphError, Result};

type StageAction<T> = Box<dyn FnOnce(StageInputs<T>) -> BoxFuture<'static, Result<T>> + Send>;

struct Stage<T> {
    name: String,
    after: Vec<String>,
    action: StageAction<T>,
}

/// Outputs of a stage's prerequisites, by stage name.
#[derive(Debug)]
pub struct StageInputs<T> {
    outputs: HashMap<String, Arc<T>>,
}

impl<T> StageInputs<T> {
    pub(crate) fn from_outputs(outputs: HashMap<String, Arc<T>>) -> Self {
        Self { outputs }
    }

    /// Output of prerequisite `stage`.
    pub fn get(&self, stage: &str) -> Option<&T> {
        self.outputs.get(stage).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// How long a stage ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: String,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Result of a successful graph run.
#[derive(Debug)]
pub struct GraphOutcome<T> {
    /// Output of every stage, by name.
    pub outputs: HashMap<String, Arc<T>>,
    /// Stages in completion order.
    pub timings: Vec<StageTiming>,
}

impl<T> GraphOutcome<T> {
    pub fn get(&self, stage: &str) -> Option<&T> {
        self.outputs.get(stage).map(Arc::as_ref)
    }
}

/// A set of named stages with prerequisites.
pub struct TaskGraph<T> {
    stages: Vec<Stage<T>>,
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T: Send + Sync + 'static> TaskGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare stage `name`, started once every stage in `after` succeeded.
    pub fn add_stage<F, Fut>(&mut self, name: &str, after: &[&str], action: F) -> &mut Self
    where
        F: FnOnce(StageInputs<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.stages.push(Stage {
            name: name.to_string(),
            after: after.iter().map(|s| s.to_string()).collect(),
            action: Box::new(move |inputs| action(inputs).boxed()),
        });
        self
    }

    /// Stage names in declaration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Check the graph and group its stages by level: a stage's level is one
    /// more than the highest level among its prerequisites. Stages in the same
    /// level can run concurrently. Within a level, declaration order is kept.
    pub fn plan(&self) -> std::result::Result<Vec<Vec<String>>, GraphError> {
        let sorted = self.topological_order()?;

        let mut levels: HashMap<&str, usize> = HashMap::new();
        for &index in &sorted {
            let stage = &self.stages[index];
            let level = stage
                .after
                .iter()
                .filter_map(|dep| levels.get(dep.as_str()).map(|&l| l + 1))
                .max()
                .unwrap_or(0);
            levels.insert(stage.name.as_str(), level);
        }

        let depth = levels.values().copied().max().map_or(0, |max| max + 1);
        let mut plan = vec![Vec::new(); depth];
        for stage in &self.stages {
            plan[levels[stage.name.as_str()]].push(stage.name.clone());
        }
        Ok(plan)
    }

    /// Kahn's algorithm over stage indices; rejects duplicates, unknown
    /// prerequisites and cycles.
    fn topological_order(&self) -> std::result::Result<Vec<usize>, GraphError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if index.insert(stage.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicateStage(stage.name.clone()));
            }
        }

        let mut pending = vec![0usize; self.stages.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.stages.len()];
        for (i, stage) in self.stages.iter().enumerate() {
            let unique: HashSet<&str> = stage.after.iter().map(String::as_str).collect();
            for dep in unique {
                let &d = index.get(dep).ok_or_else(|| GraphError::UnknownPrerequisite {
                    stage: stage.name.clone(),
                    prerequisite: dep.to_string(),
                })?;
                pending[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..self.stages.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(self.stages.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &next in &dependents[i] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != self.stages.len() {
            let stuck = self
                .stages
                .iter()
                .enumerate()
                .filter(|(i, _)| pending[*i] > 0)
                .map(|(_, s)| s.name.clone())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }

    /// Run every stage.
    pub async fn run(self) -> Result<GraphOutcome<T>> {
        self.topological_order()?;

        let mut waiting: HashMap<String, Stage<T>> = HashMap::new();
        let mut ready: VecDeque<String> = VecDeque::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut prerequisites: HashMap<String, HashSet<String>> = HashMap::new();
        for stage in self.stages {
            let deps: HashSet<String> = stage.after.iter().cloned().collect();
            for dep in &deps {
                dependents.entry(dep.clone()).or_default().push(stage.name.clone());
            }
            if deps.is_empty() {
                ready.push_back(stage.name.clone());
            }
            prerequisites.insert(stage.name.clone(), deps);
            waiting.insert(stage.name.clone(), stage);
        }

        let mut outputs: HashMap<String, Arc<T>> = HashMap::new();
        let mut timings = Vec::new();
        let mut failure: Option<BuildError> = None;
        let mut running: JoinSet<(String, Duration, Result<T>)> = JoinSet::new();

        loop {
            if failure.is_none() {
                while let Some(name) = ready.pop_front() {
                    let Some(stage) = waiting.remove(&name) else {
                        continue;
                    };
                    let inputs = StageInputs::from_outputs(
                        stage
                            .after
                            .iter()
                            .filter_map(|dep| outputs.get(dep).map(|out| (dep.clone(), Arc::clone(out))))
                            .collect(),
                    );
                    info!(stage = %name, "stage started");
                    let action = stage.action;
                    running.spawn(async move {
                        let started = Instant::now();
                        let result = action(inputs).await;
                        (name, started.elapsed(), result)
                    });
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (name, elapsed, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    warn!(error = %err, "stage task aborted");
                    failure.get_or_insert(BuildError::Join(err));
                    continue;
                }
            };

            match result {
                Ok(output) => {
                    info!(stage = %name, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
                    outputs.insert(name.clone(), Arc::new(output));
                    timings.push(StageTiming {
                        stage: name.clone(),
                        elapsed,
                    });
                    for next in dependents.get(&name).into_iter().flatten() {
                        let Some(deps) = prerequisites.get_mut(next) else {
                            continue;
                        };
                        deps.remove(&name);
                        if deps.is_empty() {
                            ready.push_back(next.clone());
                        }
                    }
                }
                Err(err) => {
                    warn!(stage = %name, error = %err, "stage failed");
                    if failure.is_none() {
                        failure = Some(BuildError::StageFailed {
                            stage: name,
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        if let Some(err) = failure {
            if !waiting.is_empty() {
                let mut skipped: Vec<&str> = waiting.keys().map(String::as_str).collect();
                skipped.sort_unstable();
                debug!(skipped = ?skipped, "stages not started after failure");
            }
            return Err(err);
        }
        Ok(GraphOutcome { outputs, timings })
    }
}
