use std::time::Instant;

use super::{context::RuntimeContext, frontend::FrontendAdapter, mode::RuntimeMode};

pub struct Runtime<M: RuntimeMode> {
    pub mode: M,
}

impl<M: RuntimeMode> Runtime<M> {
    pub fn new(mode: M) -> Self {
        Self { mode }
    }

    /// Drives the screen until the frontend or the mode asks to quit, then
    /// disconnects. Socket events are applied between frames, in arrival order.
    pub async fn run<F: FrontendAdapter<M>>(&mut self, frontend: &mut F, ctx: &mut RuntimeContext<'_>) {
        loop {
            ctx.session.pump_events();
            self.mode.on_tick(ctx, Instant::now());
            frontend.render(&self.mode, ctx.session);

            if frontend.should_quit() || self.mode.quit_requested() {
                break;
            }

            if let Some(event) = frontend.poll_user_input(&self.mode) {
                self.mode.on_frontend_event(event, ctx);
            }
            tokio::task::yield_now().await;
        }
        ctx.session.disconnect();
    }
}
