use std::time::Instant;

use super::context::RuntimeContext;
use super::frontend::UserInputEvent;

pub trait RuntimeMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext);
    fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {}
    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext);
    /// Called once per loop iteration after pending socket events are applied.
    fn on_tick(&mut self, _ctx: &mut RuntimeContext, _now: Instant) {}
    fn quit_requested(&self) -> bool {
        false
    }
}
