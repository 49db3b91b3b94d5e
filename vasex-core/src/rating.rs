/// Number of scale lines in a trial.
pub const LINE_COUNT: usize = 3;

/// Rating of a single line.
///
/// `touched` records that the participant interacted with the line; a line is
/// considered answered on that flag, never on `value` being present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRating {
    pub value: Option<u8>,
    pub touched: bool,
}

/// Ratings of all three lines for one trial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingState {
    lines: [LineRating; LINE_COUNT],
}

impl RatingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a rating for `line` and marks it touched. Values above 100 are
    /// clamped.
    pub fn commit(&mut self, line: usize, value: u8) {
        if let Some(slot) = self.lines.get_mut(line) {
            slot.value = Some(value.min(100));
            slot.touched = true;
        }
    }

    pub fn line(&self, line: usize) -> Option<&LineRating> {
        self.lines.get(line)
    }

    pub fn value(&self, line: usize) -> Option<u8> {
        self.lines.get(line).and_then(|l| l.value)
    }

    pub fn is_touched(&self, line: usize) -> bool {
        self.lines.get(line).is_some_and(|l| l.touched)
    }

    pub fn all_touched(&self) -> bool {
        self.lines.iter().all(|l| l.touched)
    }

    pub fn lines(&self) -> &[LineRating; LINE_COUNT] {
        &self.lines
    }
}
