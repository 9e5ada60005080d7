pub mod command;
pub mod line_input;
pub mod status;
pub mod view;
