use std::sync::atomic::{AtomicU32, Ordering};

/// Admission control against the monthly send ceiling.
///
/// The baseline is the persisted count read at run start; admissions
/// this run are tracked with a compare-and-increment so concurrent
/// dispatch tasks can't both take the last slot. There is no rollback:
/// an admitted candidate consumes its slot even if the send fails.
#[derive(Debug)]
pub struct QuotaGate {
    baseline: u32,
    ceiling: u32,
    admitted: AtomicU32,
}

impl QuotaGate {
    pub fn new(baseline: u32, ceiling: u32) -> Self {
        Self {
            baseline,
            ceiling,
            admitted: AtomicU32::new(0),
        }
    }

    /// Admit one candidate if a slot remains, consuming it.
    pub fn try_admit(&self) -> bool {
        self.admitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |admitted| {
                if self.baseline + admitted < self.ceiling {
                    Some(admitted + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    pub fn admitted_this_run(&self) -> u32 {
        self.admitted.load(Ordering::SeqCst)
    }

    /// Total slots consumed in the monthly window, baseline included.
    pub fn used(&self) -> u32 {
        self.baseline + self.admitted_this_run()
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}
