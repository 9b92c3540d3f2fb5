pub(crate) mod event;
pub(crate) mod save_to_file;

pub(crate) use event::EventFilter;
pub(crate) use save_to_file::{SavablePoint, SaveToFileFilter};
