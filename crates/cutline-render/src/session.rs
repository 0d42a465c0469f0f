//! Concurrent render session.
//!
//! Requests go into a bounded job queue drained by a fixed pool of worker
//! threads. Workers composite independently and report to a sequencer
//! thread that re-orders results, so consumers see them in submission order
//! no matter which worker finished first.
//!
//! Cancellation is cooperative. Every job remembers the gate epoch it was
//! submitted under; reconfiguring or cancelling bumps the epoch, and a worker
//! that picks up a job from an older epoch resolves it as cancelled without
//! allocating an output buffer. Work already compositing always completes.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use cutline_core::{memory_budget, RationalTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::compositor::FrameCompositor;
use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::request::{RenderOutcome, RenderRequest, RequestHandle, RequestState, StateCell};

/// Worker pool and queue sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub workers: usize,
    /// Maximum queued requests; `submit` blocks beyond this
    pub queue_capacity: usize,
    /// Prefix for thread names
    pub name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            workers,
            queue_capacity: workers * memory_budget::QUEUE_DEPTH_PER_WORKER,
            name: "cutline-render".into(),
        }
    }
}

impl SessionConfig {
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            queue_capacity: workers * memory_budget::QUEUE_DEPTH_PER_WORKER,
            ..Self::default()
        }
    }
}

/// What a worker may do with a job.
#[derive(Debug, Clone)]
pub enum Admission {
    Proceed(Arc<RenderContext>),
    Cancel,
    /// No render context is installed
    Unconfigured,
}

#[derive(Debug, Default)]
struct GateSlot {
    context: Option<Arc<RenderContext>>,
    cancel_all: bool,
    epoch: u64,
}

/// Shared render context plus the cancellation state guarding it.
///
/// All fields change together under one lock, so a worker always sees either
/// the old context or the new one, never a mix.
#[derive(Debug, Default)]
pub struct RenderGate {
    slot: Mutex<GateSlot>,
}

impl RenderGate {
    pub fn new(context: Option<RenderContext>) -> Self {
        Self {
            slot: Mutex::new(GateSlot {
                context: context.map(Arc::new),
                ..GateSlot::default()
            }),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.slot.lock().epoch
    }

    pub fn context(&self) -> Option<Arc<RenderContext>> {
        self.slot.lock().context.clone()
    }

    pub fn is_cancelling(&self) -> bool {
        self.slot.lock().cancel_all
    }

    /// Decide the fate of a job submitted under `epoch`.
    pub fn admit(&self, epoch: u64) -> Admission {
        let slot = self.slot.lock();
        if slot.cancel_all || epoch < slot.epoch {
            return Admission::Cancel;
        }
        match &slot.context {
            Some(ctx) => Admission::Proceed(Arc::clone(ctx)),
            None => Admission::Unconfigured,
        }
    }

    /// Install a new context. Jobs submitted before this call are cancelled.
    ///
    /// Returns the previous context; frames it handed out stay valid.
    pub fn reconfigure(&self, context: Option<RenderContext>) -> Option<Arc<RenderContext>> {
        let mut slot = self.slot.lock();
        slot.epoch += 1;
        std::mem::replace(&mut slot.context, context.map(Arc::new))
    }

    /// Cancel every job not yet started, and keep cancelling until
    /// [`resume`](Self::resume).
    pub fn cancel_all(&self) {
        let mut slot = self.slot.lock();
        slot.epoch += 1;
        slot.cancel_all = true;
    }

    pub fn resume(&self) {
        self.slot.lock().cancel_all = false;
    }
}

/// One delivered result.
#[derive(Debug)]
pub struct RenderResult {
    pub sequence: u64,
    pub requested_time: RationalTime,
    pub outcome: RenderOutcome,
}

struct Job {
    sequence: u64,
    epoch: u64,
    request: RenderRequest,
    state: StateCell,
}

struct Submitter {
    jobs: Option<Sender<Job>>,
    next_sequence: u64,
}

/// Multi-threaded renderer with in-order result delivery.
pub struct RenderSession {
    name: String,
    gate: Arc<RenderGate>,
    submitter: Mutex<Submitter>,
    results: Receiver<RenderResult>,
    workers: Vec<JoinHandle<()>>,
    sequencer: Option<JoinHandle<()>>,
}

impl RenderSession {
    /// Start the worker pool. `context` may be `None`; requests then fail
    /// until [`reconfigure`](Self::reconfigure) installs one.
    pub fn new(
        compositor: FrameCompositor,
        context: Option<RenderContext>,
        config: SessionConfig,
    ) -> Result<Self> {
        let worker_count = config.workers.max(1);
        let (job_tx, job_rx) = bounded::<Job>(config.queue_capacity.max(1));
        let (done_tx, done_rx) = unbounded::<RenderResult>();
        let (result_tx, result_rx) = unbounded::<RenderResult>();
        let gate = Arc::new(RenderGate::new(context));
        let compositor = Arc::new(compositor);

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker = Worker {
                gate: Arc::clone(&gate),
                compositor: Arc::clone(&compositor),
                jobs: job_rx.clone(),
                done: done_tx.clone(),
            };
            match spawn_named(format!("{}-worker-{index}", config.name), move || worker.run()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(job_tx);
                    join_all(workers);
                    return Err(e);
                }
            }
        }
        drop(done_tx);

        let sequencer = match spawn_named(format!("{}-sequencer", config.name), move || {
            sequence_results(done_rx, result_tx)
        }) {
            Ok(handle) => handle,
            Err(e) => {
                drop(job_tx);
                join_all(workers);
                return Err(e);
            }
        };

        info!(
            name = %config.name,
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            "render session started"
        );
        Ok(Self {
            name: config.name,
            gate,
            submitter: Mutex::new(Submitter {
                jobs: Some(job_tx),
                next_sequence: 0,
            }),
            results: result_rx,
            workers,
            sequencer: Some(sequencer),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn gate(&self) -> &RenderGate {
        &self.gate
    }

    /// Queue a request, blocking while the queue is full.
    pub fn submit(&self, request: RenderRequest) -> Result<RequestHandle> {
        let mut submitter = self.submitter.lock();
        let jobs = submitter.jobs.as_ref().ok_or(RenderError::SessionClosed)?;

        let sequence = submitter.next_sequence;
        let time = request.time;
        let state = StateCell::default();
        let job = Job {
            sequence,
            epoch: self.gate.epoch(),
            request,
            state: state.clone(),
        };
        jobs.send(job).map_err(|_| RenderError::SessionClosed)?;
        submitter.next_sequence += 1;

        trace!(sequence, %time, "request queued");
        Ok(RequestHandle::new(sequence, time, state))
    }

    /// Results in submission order.
    pub fn results(&self) -> &Receiver<RenderResult> {
        &self.results
    }

    /// Next result, blocking. `None` once shut down and drained.
    pub fn recv(&self) -> Option<RenderResult> {
        self.results.recv().ok()
    }

    /// Swap the render context; queued requests are cancelled.
    pub fn reconfigure(&self, context: Option<RenderContext>) -> Option<Arc<RenderContext>> {
        let previous = self.gate.reconfigure(context);
        debug!(name = %self.name, "render context reconfigured");
        previous
    }

    pub fn cancel_all(&self) {
        self.gate.cancel_all();
        debug!(name = %self.name, "all pending requests cancelled");
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Cancel what is still queued and stop all threads.
    ///
    /// Results already produced, including the cancellations, stay
    /// readable through [`results`](Self::results).
    pub fn shutdown(&mut self) {
        let Some(jobs) = self.submitter.lock().jobs.take() else {
            return;
        };
        self.gate.cancel_all();
        drop(jobs);

        join_all(std::mem::take(&mut self.workers));
        if let Some(sequencer) = self.sequencer.take() {
            if sequencer.join().is_err() {
                warn!(name = %self.name, "sequencer thread panicked");
            }
        }
        info!(name = %self.name, "render session shut down");
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    gate: Arc<RenderGate>,
    compositor: Arc<FrameCompositor>,
    jobs: Receiver<Job>,
    done: Sender<RenderResult>,
}

impl Worker {
    fn run(self) {
        for job in self.jobs.iter() {
            let outcome = catch_render_panic(job.sequence, || self.process(&job));
            if matches!(outcome, RenderOutcome::Failed(_)) {
                job.state.advance(RequestState::Rendering);
            }
            if !job.state.advance(outcome.state()) {
                warn!(sequence = job.sequence, state = ?job.state.get(), "unexpected request state");
            }
            let result = RenderResult {
                sequence: job.sequence,
                requested_time: job.request.time,
                outcome,
            };
            if self.done.send(result).is_err() {
                break;
            }
        }
    }

    fn process(&self, job: &Job) -> RenderOutcome {
        match self.gate.admit(job.epoch) {
            Admission::Cancel => {
                trace!(sequence = job.sequence, "request cancelled before start");
                RenderOutcome::Cancelled
            }
            Admission::Unconfigured => RenderOutcome::Failed(RenderError::MissingPixelBuffer),
            Admission::Proceed(context) => {
                job.state.advance(RequestState::Rendering);
                match self.compositor.render(&job.request, &context) {
                    Ok(frame) => RenderOutcome::Finished(frame),
                    Err(e) => {
                        warn!(sequence = job.sequence, time = %job.request.time, "render failed: {e}");
                        RenderOutcome::Failed(e)
                    }
                }
            }
        }
    }
}

/// Run one render, turning a panic into a failed outcome so its sequence
/// number still reaches the sequencer.
fn catch_render_panic(sequence: u64, render: impl FnOnce() -> RenderOutcome) -> RenderOutcome {
    match catch_unwind(AssertUnwindSafe(render)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(sequence, "render panicked: {message}");
            RenderOutcome::Failed(RenderError::WorkerPanicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Forward results in sequence order, holding early arrivals back.
fn sequence_results(done: Receiver<RenderResult>, out: Sender<RenderResult>) {
    let mut pending = BTreeMap::new();
    let mut next = 0u64;

    for result in done.iter() {
        pending.insert(result.sequence, result);
        while let Some(result) = pending.remove(&next) {
            next += 1;
            if out.send(result).is_err() {
                return;
            }
        }
    }

    if !pending.is_empty() {
        warn!(
            held = pending.len(),
            expected = next,
            "sequence gap at shutdown, flushing remaining results"
        );
        for (_, result) in pending {
            let _ = out.send(result);
        }
    }
}

fn spawn_named(name: String, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name)
        .spawn(f)
        .map_err(|e| RenderError::ThreadSpawn(e.to_string()))
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            warn!("render worker panicked");
        }
    }
}
