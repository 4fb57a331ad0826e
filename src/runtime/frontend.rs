use super::mode::RuntimeMode;
use crate::state::ChatSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp(usize),
    PageDown(usize),
    Home,
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInputEvent {
    Text(String),
    Interrupt,
    Scroll(ScrollAction),
    /// The history pane was laid out at a new size, in columns and rows.
    Viewport { width: usize, rows: usize },
}

pub trait FrontendAdapter<M: RuntimeMode> {
    fn poll_user_input(&mut self, mode: &M) -> Option<UserInputEvent>;
    fn render(&mut self, mode: &M, session: &ChatSession);
    fn should_quit(&self) -> bool;
}
