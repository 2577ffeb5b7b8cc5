pub mod chat_area;
pub mod contacts;
pub mod input_bar;
pub mod welcome;
