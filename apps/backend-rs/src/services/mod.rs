pub mod catalog;
pub mod date_range;
pub mod recommendations;
pub mod reviews;
pub mod whatsapp;
