use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared "keep running" flag for the frame loop.
///
/// Cloned into signal handlers; the loop checks it at the top of every
/// iteration so a cleared flag never schedules another frame.
#[derive(Clone, Debug)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let liveness = Liveness::new();
        let handle = liveness.clone();
        assert!(liveness.is_alive());
        handle.end();
        assert!(!liveness.is_alive());
    }
}
