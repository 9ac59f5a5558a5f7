//! Decoding of nested JSON arrays into a flat row-major array.
//!
//! The raster backend encodes coverage subsets as arrays nested to the
//! coverage's dimensionality, with leaves that are numbers, numeric
//! strings, or null. Ragged nesting is a decode error: the shape must be
//! rectangular to index it by the declared axes.

use serde_json::Value;

use crate::error::FetchError;

/// A dense n-dimensional array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NdArray {
    /// Decode a nested JSON array.
    ///
    /// Null leaves become NaN so they survive into the nullify step
    /// without inventing a value.
    pub fn from_json(value: &Value) -> Result<Self, FetchError> {
        let mut shape = Vec::new();
        measure_shape(value, &mut shape)?;

        let mut data = Vec::with_capacity(shape.iter().product());
        collect_values(value, &shape, 0, &mut data)?;

        Ok(Self { shape, data })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The value at a full multi-index, if in range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&idx, &dim) in index.iter().zip(&self.shape) {
            if idx >= dim {
                return None;
            }
            flat = flat * dim + idx;
        }
        self.data.get(flat).copied()
    }

    /// Iterate every multi-index of the leading `dims` axes.
    ///
    /// Used to walk the non-spatial axes of a window response, where the
    /// trailing two axes are the Y/X grid.
    pub fn outer_indices(&self, dims: usize) -> Vec<Vec<usize>> {
        let outer = &self.shape[..dims.min(self.shape.len())];
        let mut indices = vec![Vec::new()];
        for &dim in outer {
            let mut next = Vec::with_capacity(indices.len() * dim);
            for prefix in &indices {
                for i in 0..dim {
                    let mut idx = prefix.clone();
                    idx.push(i);
                    next.push(idx);
                }
            }
            indices = next;
        }
        indices
    }

    /// Copy the contiguous block selected by a leading multi-index.
    ///
    /// For a window response with shape `[..., height, width]`, passing
    /// the outer index yields the `height * width` grid values.
    pub fn slice(&self, outer_index: &[usize]) -> Option<Vec<f64>> {
        if outer_index.len() > self.shape.len() {
            return None;
        }
        let block: usize = self.shape[outer_index.len()..].iter().product();
        let mut offset = 0usize;
        for (&idx, &dim) in outer_index.iter().zip(&self.shape) {
            if idx >= dim {
                return None;
            }
            offset = offset * dim + idx;
        }
        let start = offset * block;
        self.data.get(start..start + block).map(|s| s.to_vec())
    }
}

/// Record the nesting depth and per-level lengths of the first branch.
fn measure_shape(value: &Value, shape: &mut Vec<usize>) -> Result<(), FetchError> {
    if let Value::Array(items) = value {
        shape.push(items.len());
        if let Some(first) = items.first() {
            measure_shape(first, shape)?;
        }
    }
    Ok(())
}

/// Walk the full structure, enforcing the measured shape at every level.
fn collect_values(
    value: &Value,
    shape: &[usize],
    depth: usize,
    data: &mut Vec<f64>,
) -> Result<(), FetchError> {
    if depth == shape.len() {
        data.push(leaf_value(value)?);
        return Ok(());
    }

    let Value::Array(items) = value else {
        return Err(FetchError::Decode(format!(
            "expected an array at depth {}, got {}",
            depth, value
        )));
    };

    if items.len() != shape[depth] {
        return Err(FetchError::Decode(format!(
            "ragged array: expected {} items at depth {}, got {}",
            shape[depth],
            depth,
            items.len()
        )));
    }

    for item in items {
        collect_values(item, shape, depth + 1, data)?;
    }
    Ok(())
}

/// Decode one leaf: a number, a numeric string, or null (NaN).
fn leaf_value(value: &Value) -> Result<f64, FetchError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::Decode(format!("non-finite number: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FetchError::Decode(format!("non-numeric leaf: {:?}", s))),
        Value::Null => Ok(f64::NAN),
        other => Err(FetchError::Decode(format!("unexpected leaf: {}", other))),
    }
}
