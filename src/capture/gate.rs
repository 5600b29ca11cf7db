use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Admits one capture flow at a time.
#[derive(Clone, Default)]
pub struct CaptureGate {
    busy: Arc<AtomicBool>,
}

/// Held for the length of a capture flow; dropping it reopens the gate.
pub struct CapturePermit {
    busy: Arc<AtomicBool>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<CapturePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CapturePermit {
                busy: Arc::clone(&self.busy),
            })
    }
}

impl Drop for CapturePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_capture_is_rejected_until_permit_drops() {
        let gate = CaptureGate::new();

        let permit = gate.try_acquire().expect("first capture admitted");
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn clones_share_state() {
        let gate = CaptureGate::new();
        let other = gate.clone();

        let _permit = gate.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }
}
