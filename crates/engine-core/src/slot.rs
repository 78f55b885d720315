use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug)]
enum SlotState<T, E> {
    Empty,
    Value(T),
    Error(E),
}

/// Reusable single-item mailbox between one producer and one consumer.
///
/// A write replaces whatever is still unread, so the producer must only
/// write after the consumer drained the previous item. The prefetch worker
/// guarantees this by never having more than one page request outstanding.
///
/// `put_error` doubles as the way for a producer to wake a consumer that is
/// parked in [`take`](HandoffSlot::take).
#[derive(Debug)]
pub struct HandoffSlot<T, E> {
    state: Mutex<SlotState<T, E>>,
    available: Notify,
}

impl<T, E> Default for HandoffSlot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> HandoffSlot<T, E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            available: Notify::new(),
        }
    }

    /// Store `value`, discarding any unread value or error.
    pub fn put(&self, value: T) {
        self.write(SlotState::Value(value));
    }

    /// Store `error` in place of a value.
    pub fn put_error(&self, error: E) {
        self.write(SlotState::Error(error));
    }

    /// Non-blocking read. `Ok(None)` means nothing has been delivered yet.
    pub fn poll(&self) -> Result<Option<T>, E> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, SlotState::Empty) {
            SlotState::Empty => Ok(None),
            SlotState::Value(value) => Ok(Some(value)),
            SlotState::Error(error) => Err(error),
        }
    }

    /// Wait until a value or an error is delivered, then consume it.
    pub async fn take(&self) -> Result<T, E> {
        loop {
            // Register for the wake-up before looking at the state, so a write
            // landing between the check and the await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.poll().transpose() {
                return result;
            }

            notified.await;
        }
    }

    /// True if a value or error is waiting to be read.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.lock(), SlotState::Empty)
    }

    fn write(&self, next: SlotState<T, E>) {
        {
            let mut state = self.lock();
            *state = next;
        }
        self.available.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
