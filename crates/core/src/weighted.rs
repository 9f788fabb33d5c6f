//! Weighted random selection scaled by path kind and normalized depth.

use serde::{Deserialize, Serialize};

use crate::random::RandomStream;

/// Piecewise-linear multiplier over normalized depth. No keys means a constant 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepthCurve {
    keys: Vec<(f32, f32)>,
}

impl DepthCurve {
    pub fn constant() -> Self {
        Self::default()
    }

    /// Keys are sorted by depth on construction.
    pub fn from_keys(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, depth: f32) -> f32 {
        let Some(&(first_depth, first_scale)) = self.keys.first() else {
            return 1.0;
        };
        if depth <= first_depth {
            return first_scale;
        }
        for pair in self.keys.windows(2) {
            let (from_depth, from_scale) = pair[0];
            let (to_depth, to_scale) = pair[1];
            if depth <= to_depth {
                let span = to_depth - from_depth;
                if span <= f32::EPSILON {
                    return to_scale;
                }
                let t = (depth - from_depth) / span;
                return from_scale + (to_scale - from_scale) * t;
            }
        }
        self.keys.last().map_or(1.0, |&(_, scale)| scale)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub main_path_weight: f32,
    pub branch_path_weight: f32,
    #[serde(default)]
    pub depth_curve: DepthCurve,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f32) -> Self {
        Self {
            value,
            main_path_weight: weight,
            branch_path_weight: weight,
            depth_curve: DepthCurve::constant(),
        }
    }

    pub fn effective_weight(&self, on_main_path: bool, normalized_depth: f32) -> f32 {
        let base = if on_main_path { self.main_path_weight } else { self.branch_path_weight };
        base * self.depth_curve.evaluate(normalized_depth)
    }
}

/// Options for a single draw from a [`WeightedTable`].
#[derive(Clone, Copy, Debug)]
pub struct DrawContext<'a, T> {
    pub on_main_path: bool,
    pub normalized_depth: f32,
    pub exclude: Option<&'a T>,
    pub allow_repeat: bool,
    pub remove_on_draw: bool,
}

impl<T> DrawContext<'_, T> {
    pub fn new(on_main_path: bool, normalized_depth: f32) -> Self {
        Self {
            on_main_path,
            normalized_depth,
            exclude: None,
            allow_repeat: true,
            remove_on_draw: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable<T> {
    entries: Vec<Weighted<T>>,
}

impl<T> Default for WeightedTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Clone + PartialEq> WeightedTable<T> {
    pub fn new(entries: Vec<Weighted<T>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Weighted<T>] {
        &self.entries
    }

    pub fn push(&mut self, entry: Weighted<T>) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = Weighted<T>>) {
        self.entries.extend(entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_positive_weight(&self, on_main_path: bool, normalized_depth: f32) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.effective_weight(on_main_path, normalized_depth) > 0.0)
    }

    fn is_eligible(&self, entry: &Weighted<T>, context: &DrawContext<'_, T>) -> bool {
        if context.allow_repeat {
            return true;
        }
        context.exclude.is_none_or(|excluded| entry.value != *excluded)
    }

    /// Draws one entry, or `None` when nothing eligible carries positive weight.
    pub fn draw(
        &mut self,
        random: &mut RandomStream,
        context: DrawContext<'_, T>,
    ) -> Option<Weighted<T>> {
        let mut total = 0.0_f64;
        let mut last_eligible = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let weight = entry.effective_weight(context.on_main_path, context.normalized_depth);
            if weight > 0.0 && self.is_eligible(entry, &context) {
                total += f64::from(weight);
                last_eligible = Some(index);
            }
        }
        let last_eligible = last_eligible?;

        let mut remaining = random.next_double() * total;
        let mut chosen = last_eligible;
        for (index, entry) in self.entries.iter().enumerate() {
            let weight = entry.effective_weight(context.on_main_path, context.normalized_depth);
            if weight <= 0.0 || !self.is_eligible(entry, &context) {
                continue;
            }
            if remaining < f64::from(weight) {
                chosen = index;
                break;
            }
            remaining -= f64::from(weight);
        }

        if context.remove_on_draw {
            Some(self.entries.remove(chosen))
        } else {
            Some(self.entries[chosen].clone())
        }
    }
}
