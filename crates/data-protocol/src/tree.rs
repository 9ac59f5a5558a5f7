//! The nested result tree all responses are assembled in.
//!
//! Query results are keyed by the dataset's declared axes (era, model,
//! scenario, ...) with the variable or statistic name at the leaf. Both
//! output encodings are derived from this one structure: JSON serializes
//! the nesting directly, CSV flattens each root-to-leaf path into a row.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// One node of a result tree: an interior map or a leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(Value),
}

/// An ordered nested map from key path to value.
///
/// Keys iterate in lexical order (BTreeMap), so serialization is stable
/// without any extra bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTree {
    root: BTreeMap<String, Node>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the tree holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Insert a leaf at the given key path, creating branches as needed.
    ///
    /// An existing leaf on the path is replaced by a branch; the last
    /// writer wins, which never happens for well-formed axis paths.
    pub fn insert(&mut self, path: &[String], value: Value) {
        if path.is_empty() {
            return;
        }
        insert_into(&mut self.root, path, value);
    }

    /// Replace leaves equal to any nodata sentinel (or non-finite) with null.
    pub fn nullify(&mut self, sentinels: &[f64]) {
        for node in self.root.values_mut() {
            nullify_node(node, sentinels);
        }
    }

    /// Drop null leaves, then drop branches that became empty, bottom-up.
    ///
    /// An all-null tree prunes to empty; the caller decides whether that
    /// means "no data here" for the whole request.
    pub fn prune(&mut self) {
        prune_map(&mut self.root);
    }

    /// Round fractional float leaves to `precision` decimal places.
    ///
    /// Rounds half away from zero. Integer-valued leaves are left alone so
    /// categorical codes and years keep their integer representation.
    pub fn round(&mut self, precision: u32) {
        for node in self.root.values_mut() {
            round_node(node, precision);
        }
    }

    /// Collapse the axis at `depth` into min/mean/max across its values.
    ///
    /// This is the `summarize=mmm` transform: every leaf path has the key
    /// at `depth` (the year or era) removed, and the values that now share
    /// a path are reduced to three leaves named `min`, `mean`, `max`.
    /// Non-numeric leaves and paths shorter than `depth` are dropped.
    pub fn summarize_mmm(&self, depth: usize) -> ResultTree {
        let mut groups: BTreeMap<Vec<String>, Vec<f64>> = BTreeMap::new();

        for (path, value) in self.flatten() {
            if path.len() <= depth {
                continue;
            }
            let Some(v) = value.as_f64() else { continue };

            let mut key = path;
            key.remove(depth);
            groups.entry(key).or_default().push(v);
        }

        let mut out = ResultTree::new();
        for (path, values) in groups {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;

            for (stat, v) in [("min", min), ("mean", mean), ("max", max)] {
                let mut leaf_path = path.clone();
                leaf_path.push(stat.to_string());
                out.insert(&leaf_path, float_value(v));
            }
        }
        out
    }

    /// Every root-to-leaf path with its value, in lexical path order.
    pub fn flatten(&self) -> Vec<(Vec<String>, Value)> {
        let mut rows = Vec::new();
        let mut prefix = Vec::new();
        flatten_map(&self.root, &mut prefix, &mut rows);
        rows
    }

    /// The tree as a nested JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(map_to_json(&self.root))
    }
}

fn insert_into(map: &mut BTreeMap<String, Node>, path: &[String], value: Value) {
    let key = path[0].clone();

    if path.len() == 1 {
        map.insert(key, Node::Leaf(value));
        return;
    }

    let entry = map
        .entry(key)
        .or_insert_with(|| Node::Branch(BTreeMap::new()));

    if let Node::Leaf(_) = entry {
        *entry = Node::Branch(BTreeMap::new());
    }

    if let Node::Branch(children) = entry {
        insert_into(children, &path[1..], value);
    }
}

fn nullify_node(node: &mut Node, sentinels: &[f64]) {
    match node {
        Node::Branch(children) => {
            for child in children.values_mut() {
                nullify_node(child, sentinels);
            }
        }
        Node::Leaf(value) => {
            if let Some(v) = value.as_f64() {
                if !v.is_finite() || sentinels.contains(&v) {
                    *value = Value::Null;
                }
            }
        }
    }
}

fn prune_map(map: &mut BTreeMap<String, Node>) {
    map.retain(|_, node| match node {
        Node::Leaf(value) => !value.is_null(),
        Node::Branch(children) => {
            prune_map(children);
            !children.is_empty()
        }
    });
}

fn round_node(node: &mut Node, precision: u32) {
    match node {
        Node::Branch(children) => {
            for child in children.values_mut() {
                round_node(child, precision);
            }
        }
        Node::Leaf(Value::Number(n)) => {
            // Only touch numbers that carry a fractional part; integers
            // stay integers through serialization.
            if n.is_f64() {
                if let Some(v) = n.as_f64() {
                    let rounded = round_half_away(v, precision);
                    if let Some(new) = Number::from_f64(rounded) {
                        *n = new;
                    }
                }
            }
        }
        Node::Leaf(_) => {}
    }
}

/// Round half away from zero to `precision` decimal places.
pub fn round_half_away(v: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (v * factor).round() / factor
}

/// Wrap a finite float as a JSON number; non-finite becomes null.
pub fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn flatten_map(
    map: &BTreeMap<String, Node>,
    prefix: &mut Vec<String>,
    rows: &mut Vec<(Vec<String>, Value)>,
) {
    for (key, node) in map {
        prefix.push(key.clone());
        match node {
            Node::Leaf(value) => rows.push((prefix.clone(), value.clone())),
            Node::Branch(children) => flatten_map(children, prefix, rows),
        }
        prefix.pop();
    }
}

fn map_to_json(map: &BTreeMap<String, Node>) -> serde_json::Map<String, Value> {
    map.iter()
        .map(|(key, node)| {
            let value = match node {
                Node::Leaf(v) => v.clone(),
                Node::Branch(children) => Value::Object(map_to_json(children)),
            };
            (key.clone(), value)
        })
        .collect()
}
