use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::model::{ModelBackend, ScoringModel};
use crate::config::ModelSettings;
use crate::error::{EngineError, EngineResult};

type LoadOutcome = EngineResult<Arc<dyn ScoringModel>>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

struct ResidentModel {
    model: Arc<dyn ScoringModel>,
    loaded_at: DateTime<Utc>,
}

struct InFlightLoad {
    load: SharedLoad,
    abort: AbortHandle,
    generation: u64,
}

#[derive(Default)]
struct LoaderState {
    resident: HashMap<String, ResidentModel>,
    in_flight: HashMap<String, InFlightLoad>,
    next_generation: u64,
}

impl LoaderState {
    /// Clear the in-flight marker for `name` only if it still belongs to the
    /// load tagged `generation`. After a shutdown a newer load may own it.
    fn finish_load(&mut self, name: &str, generation: u64) {
        if self
            .in_flight
            .get(name)
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            self.in_flight.remove(name);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub loaded_at: DateTime<Utc>,
}

/// Lazily loads named models and keeps them resident.
///
/// Concurrent `load` calls for the same name share one backend load: the
/// first caller registers the in-flight load under the state lock and every
/// later caller awaits that same shared future until it settles. The load
/// itself runs on its own task, so the resident/in-flight bookkeeping is
/// committed even if the caller that started it goes away.
#[derive(Clone)]
pub struct ModelLoader {
    backend: Arc<dyn ModelBackend>,
    state: Arc<Mutex<LoaderState>>,
    load_timeout: Duration,
}

impl ModelLoader {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: &ModelSettings) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(LoaderState::default())),
            load_timeout: settings.load_timeout(),
        }
    }

    /// Return the resident model, join an in-flight load, or start a new one.
    pub async fn load(&self, name: &str) -> LoadOutcome {
        let pending = {
            let mut state = self.state.lock().await;

            if let Some(resident) = state.resident.get(name) {
                return Ok(Arc::clone(&resident.model));
            }

            match state.in_flight.get(name) {
                Some(in_flight) => {
                    debug!(model = %name, "Joining in-flight model load");
                    in_flight.load.clone()
                }
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    let in_flight = self.start_load(name, generation);
                    let load = in_flight.load.clone();
                    state.in_flight.insert(name.to_string(), in_flight);
                    load
                }
            }
        };

        pending.await
    }

    /// Must be called with the state lock held so the spawned task cannot
    /// commit before the in-flight entry is registered.
    fn start_load(&self, name: &str, generation: u64) -> InFlightLoad {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let load_timeout = self.load_timeout;
        let model_name = name.to_string();

        let task = tokio::spawn(async move {
            info!(model = %model_name, "Loading model");

            let outcome = match tokio::time::timeout(load_timeout, backend.load(&model_name)).await {
                Ok(Ok(model)) => Ok(model),
                Ok(Err(e)) => Err(EngineError::model_load(&model_name, format!("{:#}", e))),
                Err(_) => Err(EngineError::model_load(
                    &model_name,
                    format!("timed out after {:?}", load_timeout),
                )),
            };

            let mut state = state.lock().await;
            state.finish_load(&model_name, generation);
            match &outcome {
                Ok(model) => {
                    info!(model = %model_name, "Model loaded");
                    state.resident.insert(
                        model_name.clone(),
                        ResidentModel {
                            model: Arc::clone(model),
                            loaded_at: Utc::now(),
                        },
                    );
                }
                Err(e) => warn!(model = %model_name, error = %e, "Model load failed"),
            }

            outcome
        });

        let abort = task.abort_handle();
        let state = Arc::clone(&self.state);
        let model_name = name.to_string();
        let load = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Task aborted or panicked before it could clear its own marker
                    state.lock().await.finish_load(&model_name, generation);
                    Err(EngineError::model_load(&model_name, e))
                }
            }
        }
        .boxed()
        .shared();

        InFlightLoad {
            load,
            abort,
            generation,
        }
    }

    /// Drop a resident model. Returns whether it was resident.
    pub async fn unload(&self, name: &str) -> bool {
        let removed = self.state.lock().await.resident.remove(name).is_some();
        if removed {
            info!(model = %name, "Unloaded model");
        }
        removed
    }

    /// Load every named model concurrently in the background. Failures are
    /// logged and otherwise ignored.
    pub fn warm_up(&self, names: &[String]) -> JoinHandle<()> {
        let loader = self.clone();
        let names = names.to_vec();

        tokio::spawn(async move {
            info!(models = ?names, "Warming up models");
            let outcomes = join_all(names.iter().map(|name| loader.load(name))).await;

            let mut loaded = 0;
            for (name, outcome) in names.iter().zip(outcomes) {
                match outcome {
                    Ok(_) => loaded += 1,
                    Err(e) => warn!(model = %name, error = %e, "Warm-up load failed"),
                }
            }
            info!("Warm-up complete: {}/{} models resident", loaded, names.len());
        })
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.state.lock().await.resident.contains_key(name)
    }

    /// Names of resident models, sorted
    pub async fn loaded_models(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state.resident.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn resident_models(&self) -> Vec<ModelInfo> {
        let state = self.state.lock().await;
        let mut models: Vec<ModelInfo> = state
            .resident
            .iter()
            .map(|(name, resident)| ModelInfo {
                name: name.clone(),
                version: resident.model.version().to_string(),
                loaded_at: resident.loaded_at,
            })
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    /// Abort pending loads and drop every resident model.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        for (name, in_flight) in state.in_flight.drain() {
            debug!(model = %name, "Aborting in-flight model load");
            in_flight.abort.abort();
        }
        let count = state.resident.len();
        state.resident.clear();
        info!("Model loader shut down ({} models unloaded)", count);
    }
}
