use sha2::{Digest, Sha256};

/// Short, stable identifier for a prompt, safe to put in logs.
pub fn prompt_digest(prompt: &str) -> String {
    let mut h = Sha256::new();
    h.update(prompt.as_bytes());
    let full = hex::encode(h.finalize());
    full[..16].to_string()
}
