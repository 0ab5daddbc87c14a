//! The predict capability shared by every model backend.
//!
//! Backends implement [`Predictor`]; callers only ever see a [`ModelHandle`], which
//! serializes predict calls on the wrapped model and optionally enforces a deadline.

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU8, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use anyhow::Result;
use log::{debug, warn};
use ndarray::{Array2, Array4, ArrayD, Axis};

use crate::error::HubError;

/// Model-ready input batches.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    /// Token indices, shape `[batch, sequence]`.
    Tokens(Array2<i64>),
    /// Raw pixel samples, shape `[batch, height, width, channels]`.
    Pixels(Array4<f32>),
}

impl ModelInput {
    pub fn shape(&self) -> &[usize] {
        match self {
            ModelInput::Tokens(batch) => batch.shape(),
            ModelInput::Pixels(batch) => batch.shape(),
        }
    }

    /// Flatten every batch entry into one `f32` row, for models that take plain feature vectors.
    pub fn to_feature_matrix(&self) -> Result<Array2<f32>> {
        match self {
            ModelInput::Tokens(batch) => Ok(batch.mapv(|v| v as f32)),
            ModelInput::Pixels(batch) => {
                let rows = batch.len_of(Axis(0));
                let cols = if rows == 0 { 0 } else { batch.len() / rows };
                let flat: Vec<f32> = batch.iter().copied().collect();
                Ok(Array2::from_shape_vec((rows, cols), flat)?)
            }
        }
    }
}

/// Anything that can turn a [`ModelInput`] into numeric output.
///
/// Implementations are not required to be `Sync`; [`ModelHandle`] guarantees one call at a time.
pub trait Predictor: Send + fmt::Debug {
    fn predict(&self, input: &ModelInput) -> Result<ArrayD<f32>>;
}

/// Shared, serialized access to a loaded model.
///
/// Clones refer to the same model and share its lock.
#[derive(Clone)]
pub struct ModelHandle {
    name: Arc<str>,
    model: Arc<Mutex<Box<dyn Predictor>>>,
    deadline: Option<Duration>,
    /// Timed-out predictions that are still running.
    stalled: Arc<AtomicUsize>,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("deadline", &self.deadline)
            .field("stalled", &self.stalled_predictions())
            .finish()
    }
}

impl ModelHandle {
    pub fn new<P>(name: impl Into<Arc<str>>, predictor: P) -> Self
    where
        P: Predictor + 'static,
    {
        Self::from_boxed(name, Box::new(predictor))
    }

    pub fn from_boxed(name: impl Into<Arc<str>>, predictor: Box<dyn Predictor>) -> Self {
        Self {
            name: name.into(),
            model: Arc::new(Mutex::new(predictor)),
            deadline: None,
            stalled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return a handle that gives up waiting after `deadline`.
    ///
    /// An abandoned prediction still runs to completion on its worker thread and keeps the
    /// model locked until it does. Until then every deadline-bound call on this model (from
    /// any clone) fails with [`HubError::Timeout`] straight away, so at most one worker thread
    /// is ever left behind.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Number of timed-out predictions that have not finished yet.
    pub fn stalled_predictions(&self) -> usize {
        self.stalled.load(Ordering::SeqCst)
    }

    /// Run one prediction, blocking until it finishes or the deadline passes.
    pub fn predict(&self, input: ModelInput) -> Result<ArrayD<f32>, HubError> {
        match self.deadline {
            None => self.predict_locked(&input),
            Some(limit) => self.predict_within(input, limit),
        }
    }

    fn predict_locked(&self, input: &ModelInput) -> Result<ArrayD<f32>, HubError> {
        let model = self.model.lock().map_err(|_| {
            HubError::ModelInference(format!(
                "model '{}' is unusable after a panic during a previous prediction",
                self.name
            ))
        })?;
        debug!("running '{}' on input {:?}", self.name, input.shape());
        model.predict(input).map_err(HubError::inference)
    }

    fn predict_within(&self, input: ModelInput, limit: Duration) -> Result<ArrayD<f32>, HubError> {
        let stalled = self.stalled_predictions();
        if stalled > 0 {
            warn!(
                "'{}' is still running {stalled} timed-out prediction(s); not queueing another",
                self.name
            );
            return Err(HubError::Timeout(limit));
        }

        let (sender, receiver) = mpsc::channel();
        let state = Arc::new(AtomicU8::new(PENDING));
        let settle = Settle {
            state: Arc::clone(&state),
            stalled: Arc::clone(&self.stalled),
        };
        let worker = self.clone();
        thread::Builder::new()
            .name(format!("predict-{}", self.name))
            .spawn(move || {
                let _settle = settle;
                let _ = sender.send(worker.predict_locked(&input));
            })
            .map_err(|e| {
                HubError::ModelInference(format!("failed to spawn prediction worker: {e}"))
            })?;

        match receiver.recv_timeout(limit) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.stalled.fetch_add(1, Ordering::SeqCst);
                if state.swap(ABANDONED, Ordering::SeqCst) == FINISHED {
                    // The worker finished between the timeout and the swap.
                    self.stalled.fetch_sub(1, Ordering::SeqCst);
                    if let Ok(result) = receiver.try_recv() {
                        return result;
                    }
                }
                warn!("'{}' prediction exceeded {:?}", self.name, limit);
                Err(HubError::Timeout(limit))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(HubError::ModelInference(format!(
                "prediction worker for '{}' exited without a result",
                self.name
            ))),
        }
    }
}

const PENDING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Marks a deadline worker finished when dropped, including on panic.
struct Settle {
    state: Arc<AtomicU8>,
    stalled: Arc<AtomicUsize>,
}

impl Drop for Settle {
    fn drop(&mut self) {
        if self.state.swap(FINISHED, Ordering::SeqCst) == ABANDONED {
            self.stalled.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
