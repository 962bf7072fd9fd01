pub mod api_key_man;
pub mod tick;
