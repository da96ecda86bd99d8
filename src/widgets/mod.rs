pub mod client_table;
pub mod controls;
pub mod debug;
pub mod record_form;
pub mod text_input;
pub mod text_input_common;
