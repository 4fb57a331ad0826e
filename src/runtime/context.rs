use crate::state::ChatSession;

/// Borrowed per-tick context passed into every `RuntimeMode` callback.
///
/// The session is owned by the caller of `Runtime::run`; modes only ever see
/// it through this borrow, so teardown stays with the owner.
pub struct RuntimeContext<'a> {
    pub session: &'a mut ChatSession,
}

impl<'a> RuntimeContext<'a> {
    pub fn new(session: &'a mut ChatSession) -> Self {
        Self { session }
    }
}
