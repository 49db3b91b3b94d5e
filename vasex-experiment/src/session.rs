use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use log::{info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use vasex_core::{ConfigError, ResultRecord, TrialConfig};
use vasex_timing::Timer;

use crate::input::PointerKind;
use crate::layout::TextMeasure;
use crate::manifest::ManifestEntry;
use crate::widget::VasTrialWidget;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TrialStarted { index: usize, total: usize },
    TrialFinished { index: usize, record: ResultRecord },
    SessionComplete,
}

/// Builds one trial per manifest entry from a template.
///
/// The stimulus is the entry's image path, `library` its category and
/// `image_id` the file stem.
pub fn trials_from_manifest(entries: &[ManifestEntry], template: &TrialConfig) -> Vec<TrialConfig> {
    entries
        .iter()
        .map(|entry| TrialConfig {
            stimulus: Some(entry.image.clone()),
            image_id: Path::new(&entry.image)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            library: entry.category.clone(),
            ..template.clone()
        })
        .collect()
}

pub fn shuffle_trials<R: Rng + ?Sized>(trials: &mut [TrialConfig], rng: &mut R) {
    trials.shuffle(rng);
}

/// Runs a queue of trials one at a time, playing the host's part: it starts
/// each trial, forwards input, and collects the result each trial hands back.
pub struct Session<T, M>
where
    T: Timer<Timestamp = u64> + 'static,
    M: TextMeasure,
{
    pending: VecDeque<TrialConfig>,
    total: usize,
    finished: usize,
    current: Option<VasTrialWidget<T>>,
    timer: T,
    measure: M,
    results: Vec<ResultRecord>,
    tx: Sender<ResultRecord>,
    rx: Receiver<ResultRecord>,
    complete: bool,
}

impl<T, M> Session<T, M>
where
    T: Timer<Timestamp = u64> + 'static,
    M: TextMeasure,
{
    /// Creates a session. Every trial is validated up front.
    pub fn new(trials: Vec<TrialConfig>, timer: T, measure: M) -> Result<Self, ConfigError> {
        for (index, trial) in trials.iter().enumerate() {
            if let Err(e) = trial.validate() {
                warn!("Trial {} has an invalid configuration: {}", index, e);
                return Err(e);
            }
        }
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            total: trials.len(),
            pending: trials.into(),
            finished: 0,
            current: None,
            timer,
            measure,
            results: Vec::new(),
            tx,
            rx,
            complete: false,
        })
    }

    /// Starts the first trial.
    pub fn start(&mut self) -> Result<Vec<SessionEvent>, ConfigError> {
        let mut events = Vec::new();
        if self.current.is_none() && !self.complete {
            self.start_next(&mut events)?;
        }
        Ok(events)
    }

    fn start_next(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), ConfigError> {
        match self.pending.pop_front() {
            Some(config) => {
                let tx = self.tx.clone();
                let widget =
                    VasTrialWidget::start(config, self.timer.clone(), &self.measure, move |r| {
                        // The receiver lives as long as the session that owns this trial.
                        let _ = tx.send(r);
                    })?;
                self.current = Some(widget);
                events.push(SessionEvent::TrialStarted {
                    index: self.finished,
                    total: self.total,
                });
                info!("Trial {}/{}", self.finished + 1, self.total);
            }
            None => {
                self.current = None;
                self.complete = true;
                events.push(SessionEvent::SessionComplete);
                info!("Session complete: {} results", self.results.len());
            }
        }
        Ok(())
    }

    /// Forwards a frame-space pointer event to the running trial.
    pub fn dispatch(&mut self, kind: PointerKind, x: f32, y: f32) {
        if let Some(widget) = self.current.as_mut() {
            widget.dispatch(kind, x, y);
        }
    }

    /// Marks the running trial as on screen; its reaction time counts from
    /// the first call.
    pub fn mark_presented(&mut self) {
        if let Some(widget) = self.current.as_mut() {
            widget.mark_presented();
        }
    }

    /// Forwards a confirm activation, e.g. from the keyboard.
    pub fn click_confirm(&mut self) -> bool {
        self.current.as_mut().is_some_and(|w| w.click_confirm())
    }

    /// Collects finished trials and advances the queue.
    pub fn update(&mut self) -> Result<Vec<SessionEvent>, ConfigError> {
        let mut events = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            let index = self.finished;
            self.finished += 1;
            self.results.push(record.clone());
            events.push(SessionEvent::TrialFinished { index, record });
            self.start_next(&mut events)?;
        }
        Ok(events)
    }

    pub fn current(&self) -> Option<&VasTrialWidget<T>> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut VasTrialWidget<T>> {
        self.current.as_mut()
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ResultRecord> {
        self.results
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// (finished, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.finished, self.total)
    }
}
