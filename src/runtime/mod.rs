pub mod context;
pub mod frontend;
pub mod r#loop;
pub mod mode;
