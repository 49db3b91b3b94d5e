use crate::layout::ScaleLineGeometry;

/// Kind of pointer event delivered by the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Cancel,
    /// Pointer left the surface. Never ends a drag.
    Leave,
}

/// Drag state of the scale canvas.
///
/// Once a press lands on a line the drag is captured by that line: moves
/// update it regardless of vertical position, and only up or cancel release
/// the capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerState {
    #[default]
    Idle,
    Dragging {
        line: usize,
    },
}

/// A rating produced by a pointer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub line: usize,
    pub rating: u8,
}

impl PointerState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    pub fn dragged_line(&self) -> Option<usize> {
        match self {
            Self::Dragging { line } => Some(*line),
            Self::Idle => None,
        }
    }

    /// Press at canvas coordinates. Starts a new drag on the nearest line in
    /// tolerance, replacing any drag in progress; a miss leaves the state idle.
    pub fn press(&mut self, geometry: &ScaleLineGeometry, x: f32, y: f32) -> Option<Commit> {
        match geometry.hit_line(y) {
            Some(line) => {
                *self = Self::Dragging { line };
                Some(Commit {
                    line,
                    rating: geometry.lines[line].rating_at(x),
                })
            }
            None => {
                *self = Self::Idle;
                None
            }
        }
    }

    /// Move to canvas x. Only the captured line is updated.
    pub fn drag(&self, geometry: &ScaleLineGeometry, x: f32) -> Option<Commit> {
        let line = self.dragged_line()?;
        Some(Commit {
            line,
            rating: geometry.lines[line].rating_at(x),
        })
    }

    /// Ends the drag. Returns whether a capture was released.
    pub fn release(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        *self = Self::Idle;
        was_dragging
    }
}
