//! Touch drag vs tap discrimination.
//!
//! A touch only becomes a drag once it has travelled past the threshold;
//! anything shorter is a tap and toggles the controls overlay.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Movement was below the threshold so far; nothing to do.
    Pending,
    /// The drag threshold was crossed on this move.
    DragStarted { delta_px: f32 },
    /// Incremental scroll delta while dragging. Positive scrolls forward.
    Dragged { delta_px: f32 },
    Tap,
    DragEnded,
}

#[derive(Debug, Clone, Copy)]
struct Touch {
    start_y: f32,
    last_y: f32,
    dragging: bool,
}

#[derive(Debug, Clone)]
pub struct DragGesture {
    threshold_px: f32,
    touch: Option<Touch>,
}

impl DragGesture {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            touch: None,
        }
    }

    pub fn set_threshold(&mut self, threshold_px: f32) {
        self.threshold_px = threshold_px.max(0.0);
    }

    pub fn is_dragging(&self) -> bool {
        self.touch.is_some_and(|touch| touch.dragging)
    }

    pub fn touch_start(&mut self, y: f32) {
        self.touch = Some(Touch {
            start_y: y,
            last_y: y,
            dragging: false,
        });
    }

    pub fn touch_move(&mut self, y: f32) -> GestureEvent {
        let threshold = self.threshold_px;
        let Some(touch) = self.touch.as_mut() else {
            return GestureEvent::Pending;
        };
        // finger up the screen scrolls forward
        let delta_px = touch.last_y - y;
        touch.last_y = y;

        if touch.dragging {
            return GestureEvent::Dragged { delta_px };
        }
        if (y - touch.start_y).abs() > threshold {
            touch.dragging = true;
            let delta_px = touch.start_y - y;
            trace!(delta_px, "Drag threshold crossed");
            return GestureEvent::DragStarted { delta_px };
        }
        GestureEvent::Pending
    }

    pub fn touch_end(&mut self) -> GestureEvent {
        match self.touch.take() {
            Some(touch) if touch.dragging => GestureEvent::DragEnded,
            Some(_) => GestureEvent::Tap,
            None => GestureEvent::Pending,
        }
    }
}
