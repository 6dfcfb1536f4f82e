//! Integration tests driving the crate against mocked Google endpoints.

mod custom_token;
mod key_cache;
mod support;
mod verify_id_token;
