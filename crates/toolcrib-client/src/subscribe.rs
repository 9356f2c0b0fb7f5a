//! Subscriber registry — synchronous fan-out in registration order.

/// Opaque handle returned by `subscribe`; pass it back to `unsubscribe` to
/// deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// An ordered list of callbacks. Notification is synchronous and follows
/// registration order; there is no batching and no deduplication.
pub struct Subscribers<T> {
  next:    u64,
  entries: Vec<(u64, Callback<T>)>,
}

impl<T> Subscribers<T> {
  pub fn new() -> Self {
    Self { next: 0, entries: Vec::new() }
  }

  pub fn subscribe(
    &mut self,
    callback: impl FnMut(&T) + Send + 'static,
  ) -> SubscriberId {
    let id = self.next;
    self.next += 1;
    self.entries.push((id, Box::new(callback)));
    SubscriberId(id)
  }

  /// Returns whether the id was registered.
  pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
    let before = self.entries.len();
    self.entries.retain(|(entry_id, _)| *entry_id != id.0);
    self.entries.len() != before
  }

  pub fn notify(&mut self, value: &T) {
    for (_, callback) in &mut self.entries {
      callback(value);
    }
  }
}

impl<T> Default for Subscribers<T> {
  fn default() -> Self {
    Self::new()
  }
}
