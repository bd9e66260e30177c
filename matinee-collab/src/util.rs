use crossbeam::atomic::AtomicCell;

/// Source of process-unique ids, handed out to connections as they register.
pub static ID_COUNTER: AtomicCell<u64> = AtomicCell::new(1);
