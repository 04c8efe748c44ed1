pub mod json_identity_store;
