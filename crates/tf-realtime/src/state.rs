//! Lock-free snapshot publishing
//!
//! Triple buffer with one writer (control thread) and one reader (audio
//! thread). The writer publishes whole values; the reader always sees the
//! most recently published value and never blocks or allocates.

use portable_atomic::{AtomicU8, Ordering};
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Low bits of `back`: index of the buffer in the middle slot
const INDEX_MASK: u8 = 0b011;
/// Set when the middle slot holds a value the reader has not taken yet
const FRESH: u8 = 0b100;

struct Shared<T> {
    /// Three buffers: one owned by the writer, one by the reader, one in the middle
    buffers: [UnsafeCell<T>; 3],
    back: AtomicU8,
}

// Safe because each buffer index is owned by exactly one side at a time and
// ownership only changes through the atomic swap on `back`.
unsafe impl<T: Send> Sync for Shared<T> {}

/// Producer half of a snapshot channel
pub struct SnapshotWriter<T> {
    shared: Arc<Shared<T>>,
    write_idx: usize,
}

/// Consumer half of a snapshot channel
pub struct SnapshotReader<T> {
    shared: Arc<Shared<T>>,
    read_idx: usize,
}

/// Create a snapshot channel holding `initial`
pub fn snapshot_channel<T: Clone>(initial: T) -> (SnapshotWriter<T>, SnapshotReader<T>) {
    let shared = Arc::new(Shared {
        buffers: [
            UnsafeCell::new(initial.clone()),
            UnsafeCell::new(initial.clone()),
            UnsafeCell::new(initial),
        ],
        back: AtomicU8::new(1),
    });

    (
        SnapshotWriter {
            shared: Arc::clone(&shared),
            write_idx: 0,
        },
        SnapshotReader {
            shared,
            read_idx: 2,
        },
    )
}

impl<T> SnapshotWriter<T> {
    /// Publish a new value (never blocks)
    pub fn publish(&mut self, value: T) {
        // SAFETY: `write_idx` is owned by the writer until swapped out below
        unsafe {
            *self.shared.buffers[self.write_idx].get() = value;
        }
        let previous = self
            .shared
            .back
            .swap(self.write_idx as u8 | FRESH, Ordering::AcqRel);
        self.write_idx = (previous & INDEX_MASK) as usize;
    }
}

impl<T> SnapshotReader<T> {
    /// True if a value was published since the last `read`
    pub fn has_update(&self) -> bool {
        self.shared.back.load(Ordering::Acquire) & FRESH != 0
    }

    /// Latest published value
    pub fn read(&mut self) -> &T {
        if self.has_update() {
            let previous = self
                .shared
                .back
                .swap(self.read_idx as u8, Ordering::AcqRel);
            self.read_idx = (previous & INDEX_MASK) as usize;
        }
        // SAFETY: `read_idx` is owned by the reader until swapped out above
        unsafe { &*self.shared.buffers[self.read_idx].get() }
    }
}
