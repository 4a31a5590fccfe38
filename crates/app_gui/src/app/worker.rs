//! Background classification worker.
//!
//! The GUI thread never runs inference. Jobs go over an mpsc channel to a
//! dedicated thread that owns the classifier and reports progress back as
//! events. The model is loaded lazily on the first job so startup stays
//! instant even with a large model file on disk.

use eframe::egui;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use wildlife_core::{ClassifierConfig, Prediction, ResNetOrt};

pub(crate) struct Job {
    pub image: PathBuf,
    pub top_k: usize,
}

pub(crate) enum WorkerEvent {
    Status(String),
    Predictions(Vec<Prediction>),
    Failed(String),
}

pub(crate) struct Worker {
    jobs: Sender<Job>,
    events: Receiver<WorkerEvent>,
}

impl Worker {
    /// Spawn the worker thread. Dropping the returned handle closes the job
    /// channel, which ends the thread loop.
    pub fn spawn(cfg: ClassifierConfig, ctx: egui::Context) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
        thread::spawn(move || run_loop(cfg, job_rx, event_tx, ctx));
        Self {
            jobs: job_tx,
            events: event_rx,
        }
    }

    pub fn submit(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            tracing::warn!("classification worker is gone; job dropped");
        }
    }

    pub fn try_recv(&self) -> Option<WorkerEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

fn run_loop(
    cfg: ClassifierConfig,
    jobs: Receiver<Job>,
    events: Sender<WorkerEvent>,
    ctx: egui::Context,
) {
    let mut model: Option<ResNetOrt> = None;

    while let Ok(job) = jobs.recv() {
        if model.is_none() {
            let _ = events.send(WorkerEvent::Status("Loading model...".to_string()));
            ctx.request_repaint();
            match ResNetOrt::new(&cfg) {
                Ok(loaded) => model = Some(loaded),
                Err(e) => {
                    tracing::warn!("model load failed: {e:#}");
                    let _ = events.send(WorkerEvent::Failed(format!("{e:#}")));
                    ctx.request_repaint();
                    continue;
                }
            }
        }
        let Some(classifier) = model.as_ref() else {
            continue;
        };

        let _ = events.send(WorkerEvent::Status("Predicting...".to_string()));
        ctx.request_repaint();
        match classifier.predict(&job.image, job.top_k) {
            Ok(preds) => {
                let _ = events.send(WorkerEvent::Predictions(preds));
            }
            Err(e) => {
                tracing::warn!("prediction failed for {}: {e:#}", job.image.display());
                let _ = events.send(WorkerEvent::Failed(format!("{e:#}")));
            }
        }
        ctx.request_repaint();
    }
}
