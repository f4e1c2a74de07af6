//! Standard script handling.

pub mod standard;

pub use standard::{classify_script_pubkey, extract_key_id, KeyId, ScriptType};
