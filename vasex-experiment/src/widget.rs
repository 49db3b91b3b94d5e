use log::{debug, info};
use vasex_core::{ConfigError, RatingState, ResultRecord, TrialConfig, TrialPhase};
use vasex_timing::{Timer, nanos_to_millis};

use crate::input::{Commit, PointerKind, PointerState};
use crate::layout::{TextMeasure, ViewLayout, ViewTarget};

/// Receives the trial result. Boxed `FnOnce`, so it can run only once.
pub type FinishCallback = Box<dyn FnOnce(ResultRecord)>;

/// The confirm control. Activation is refused while disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmButton {
    enabled: bool,
    pressed: bool,
}

impl ConfirmButton {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pressed = false;
        }
    }

    fn press(&mut self) {
        self.pressed = self.enabled;
    }

    /// Completes a press; fires when the release lands back on the button.
    fn release(&mut self, inside: bool) -> bool {
        let fired = self.enabled && self.pressed && inside;
        self.pressed = false;
        fired
    }

    /// Programmatic activation, e.g. from a key binding.
    fn click(&self) -> bool {
        self.enabled
    }
}

/// Everything a renderer needs to draw the trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialView<'a> {
    pub config: &'a TrialConfig,
    pub layout: &'a ViewLayout,
    pub ratings: &'a RatingState,
    pub button: ConfirmButton,
}

/// Three-line VAS trial: an image box, a scale canvas and a confirm button.
///
/// Pointer handlers take canvas coordinates; [`dispatch`](Self::dispatch)
/// takes frame coordinates and routes them. After confirm the trial is
/// complete and ignores all further input.
pub struct VasTrialWidget<T: Timer<Timestamp = u64>> {
    config: TrialConfig,
    layout: ViewLayout,
    ratings: RatingState,
    pointer: PointerState,
    button: ConfirmButton,
    timer: T,
    started_at: u64,
    presented: bool,
    phase: TrialPhase,
    on_finish: Option<FinishCallback>,
    dirty: bool,
}

impl<T: Timer<Timestamp = u64>> VasTrialWidget<T> {
    /// Validates the configuration and starts the trial clock. Hosts that
    /// know when the first frame is shown call [`mark_presented`](Self::mark_presented).
    pub fn start<F>(
        config: TrialConfig,
        timer: T,
        measure: &dyn TextMeasure,
        on_finish: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(ResultRecord) + 'static,
    {
        config.validate()?;
        let layout = ViewLayout::new(&config, measure);
        let started_at = timer.now();

        info!(
            "Trial started: stimulus={:?} image_id={:?} scale={}",
            config.stimulus, config.image_id, config.scale
        );

        let mut widget = Self {
            config,
            layout,
            ratings: RatingState::new(),
            pointer: PointerState::Idle,
            button: ConfirmButton::default(),
            timer,
            started_at,
            presented: false,
            phase: TrialPhase::Running,
            on_finish: Some(Box::new(on_finish)),
            dirty: false,
        };
        widget.refresh();
        Ok(widget)
    }

    /// Recomputes derived view state after a change and schedules a redraw.
    fn refresh(&mut self) {
        self.button.set_enabled(self.ratings.all_touched());
        self.dirty = true;
    }

    fn apply(&mut self, commit: Option<Commit>) {
        if let Some(Commit { line, rating }) = commit {
            self.ratings.commit(line, rating);
            debug!("Line {} rated {}", line, rating);
            self.refresh();
        }
    }

    fn is_running(&self) -> bool {
        self.phase == TrialPhase::Running
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if !self.is_running() {
            return;
        }
        let commit = self.pointer.press(&self.layout.scales, x, y);
        if let Some(line) = self.pointer.dragged_line() {
            debug!("Drag captured by line {}", line);
        }
        self.apply(commit);
    }

    pub fn pointer_move(&mut self, x: f32, _y: f32) {
        if !self.is_running() {
            return;
        }
        let commit = self.pointer.drag(&self.layout.scales, x);
        self.apply(commit);
    }

    pub fn pointer_up(&mut self) {
        if self.pointer.release() {
            debug!("Drag released");
        }
    }

    pub fn pointer_cancel(&mut self) {
        if self.pointer.release() {
            debug!("Drag cancelled");
        }
    }

    /// Leaving the surface keeps the capture so drags stay valid past the edge.
    pub fn pointer_leave(&mut self) {}

    /// Routes an event in frame coordinates to the canvas or the button.
    pub fn dispatch(&mut self, kind: PointerKind, x: f32, y: f32) {
        if !self.is_running() {
            return;
        }
        let target = self.layout.target(x, y);
        let button = self.button;
        match kind {
            PointerKind::Down => match target {
                ViewTarget::Canvas { x, y } => self.pointer_down(x, y),
                ViewTarget::Button => {
                    self.pointer.release();
                    self.button.press();
                }
                ViewTarget::Outside => {}
            },
            PointerKind::Move => {
                let (cx, cy) = self.layout.to_canvas(x, y);
                self.pointer_move(cx, cy);
            }
            PointerKind::Up => {
                self.pointer_up();
                if self.button.release(target == ViewTarget::Button) {
                    self.confirm();
                }
            }
            PointerKind::Cancel => {
                self.pointer_cancel();
                self.button.release(false);
            }
            PointerKind::Leave => self.pointer_leave(),
        }
        if self.is_running() && self.button != button {
            self.dirty = true;
        }
    }

    /// Activates the confirm control. Returns whether the trial finished.
    pub fn click_confirm(&mut self) -> bool {
        if self.is_running() && self.button.click() {
            self.confirm();
            true
        } else {
            false
        }
    }

    fn confirm(&mut self) {
        let Some(on_finish) = self.on_finish.take() else {
            return;
        };
        let rt = nanos_to_millis(self.timer.now().saturating_sub(self.started_at));
        let record = ResultRecord::assemble(&self.config, &self.ratings, rt);

        self.pointer.release();
        self.phase = TrialPhase::Complete;
        self.dirty = false;

        info!(
            "Trial finished: rt={} ms ratings={:?}/{:?}/{:?}",
            record.rt, record.craving, record.valence, record.arousal
        );
        on_finish(record);
    }

    pub fn view(&self) -> TrialView<'_> {
        TrialView {
            config: &self.config,
            layout: &self.layout,
            ratings: &self.ratings,
            button: self.button,
        }
    }

    /// Restarts the trial clock when the first frame reaches the screen.
    /// Later calls are ignored, as are calls once the trial is complete.
    pub fn mark_presented(&mut self) {
        if self.presented || !self.is_running() {
            return;
        }
        self.presented = true;
        self.started_at = self.timer.now();
        debug!("Trial presented");
    }

    pub fn is_presented(&self) -> bool {
        self.presented
    }

    /// Returns whether a redraw is pending and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn ratings(&self) -> &RatingState {
        &self.ratings
    }

    pub fn pointer_state(&self) -> PointerState {
        self.pointer
    }

    pub fn is_capturing(&self) -> bool {
        self.pointer.is_dragging()
    }

    pub fn confirm_enabled(&self) -> bool {
        self.button.is_enabled()
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == TrialPhase::Complete
    }
}
