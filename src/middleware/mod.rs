pub mod api_key_mw;
pub mod request_id_mw;
