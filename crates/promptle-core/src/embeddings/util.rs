use crate::errors::EmbeddingError;

pub fn encode_vec_f32(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

pub fn decode_vec_f32(bytes: &[u8]) -> anyhow::Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        anyhow::bail!("invalid embedding blob size: {} bytes", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Converts a JSON `embedding` array into a vector, rejecting non-numeric
/// elements instead of skipping them.
pub fn vec_from_json(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let arr = value
        .as_array()
        .ok_or_else(|| EmbeddingError::InvalidVector("embedding is not an array".into()))?;
    arr.iter()
        .enumerate()
        .map(|(i, x)| {
            x.as_f64().map(|f| f as f32).ok_or_else(|| {
                EmbeddingError::InvalidVector(format!("element {} is not numeric", i))
            })
        })
        .collect()
}

/// Structural check applied to every vector returned by an embedding service.
pub fn validate_vector(v: &[f32], expected_dims: Option<usize>) -> Result<(), EmbeddingError> {
    if v.is_empty() {
        return Err(EmbeddingError::InvalidVector("empty vector".into()));
    }
    if let Some(dims) = expected_dims {
        if v.len() != dims {
            return Err(EmbeddingError::InvalidVector(format!(
                "expected {} dims, got {}",
                dims,
                v.len()
            )));
        }
    }
    if let Some(i) = v.iter().position(|x| !x.is_finite()) {
        return Err(EmbeddingError::InvalidVector(format!(
            "element {} is not finite",
            i
        )));
    }
    Ok(())
}
