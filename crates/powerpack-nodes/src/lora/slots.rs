//! Numbered slot resolution
//!
//! A host input schema is static, so the selector declares `cfg_1..cfg_50`
//! even though a run only populates a few of them. Here the slots are just a
//! sparse map from index to record.

use std::collections::BTreeMap;

use serde_json::Value;

use super::LoraConfig;

/// Number of declared configuration slots
pub const MAX_SLOTS: usize = 50;

/// Parse the `active` control.
///
/// Everything from the first `:` on is a display label and is ignored. A
/// value that does not parse selects slot 1; anything below 1 clamps to 1.
/// There is no upper clamp: a too-large index simply matches no slot, even
/// one beyond `usize`.
pub fn parse_active_index(active: &str) -> usize {
    let head = active.trim().split(':').next().unwrap_or_default().trim();
    let digits = head.strip_prefix('+').unwrap_or(head);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    match digits.parse::<usize>() {
        Ok(0) => 1,
        Ok(idx) => idx,
        Err(_) => usize::MAX,
    }
}

/// Sparse mapping from slot index (1-based) to a configuration record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotSet {
    slots: BTreeMap<usize, LoraConfig>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record in a slot. Indices outside `1..=MAX_SLOTS` are ignored.
    pub fn insert(&mut self, index: usize, config: LoraConfig) {
        if (1..=MAX_SLOTS).contains(&index) {
            self.slots.insert(index, config);
        }
    }

    /// Place an untyped slot value; non-records leave the slot empty.
    pub fn insert_value(&mut self, index: usize, value: &Value) {
        if let Some(config) = LoraConfig::from_value(value) {
            self.insert(index, config);
        }
    }

    pub fn get(&self, index: usize) -> Option<&LoraConfig> {
        self.slots.get(&index)
    }

    /// Record chosen by an `active` control string
    pub fn select(&self, active: &str) -> Option<&LoraConfig> {
        self.get(parse_active_index(active))
    }

    /// Populated slots in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &LoraConfig)> {
        self.slots.iter().map(|(i, c)| (*i, c))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(trigger: &str) -> LoraConfig {
        LoraConfig {
            lora: format!("{}.safetensors", trigger),
            trigger: trigger.to_string(),
            strength_model: 1.0,
            strength_clip: 1.0,
        }
    }

    #[test]
    fn test_parse_plain_and_labelled() {
        assert_eq!(parse_active_index("3"), 3);
        assert_eq!(parse_active_index("  12 "), 12);
        assert_eq!(parse_active_index("4: inkstyle"), 4);
        assert_eq!(parse_active_index("4 :7"), 4);
        assert_eq!(parse_active_index("2:3:4"), 2);
    }

    #[test]
    fn test_parse_defaults_and_clamps() {
        assert_eq!(parse_active_index(""), 1);
        assert_eq!(parse_active_index("abc"), 1);
        assert_eq!(parse_active_index(":5"), 1);
        assert_eq!(parse_active_index("0"), 1);
        assert_eq!(parse_active_index("-3"), 1);
        assert_eq!(parse_active_index("-3: label"), 1);
        assert_eq!(parse_active_index("2.5"), 1);
        assert_eq!(parse_active_index("999"), 999);
        assert_eq!(parse_active_index("+7"), 7);
        assert_eq!(parse_active_index("99999999999999999999"), usize::MAX);
        assert_eq!(parse_active_index("-99999999999999999999"), 1);
    }

    #[test]
    fn test_select_only_prefix_matters() {
        let mut slots = SlotSet::new();
        slots.insert(2, cfg("second"));
        slots.insert(3, cfg("third"));

        assert_eq!(slots.select("2: third").unwrap().trigger, "second");
        assert_eq!(slots.select("3:whatever").unwrap().trigger, "third");
        assert!(slots.select("1").is_none());
        assert!(slots.select("60").is_none());
        assert!(slots.select("99999999999999999999: huge").is_none());
    }

    #[test]
    fn test_insert_bounds_and_values() {
        let mut slots = SlotSet::new();
        slots.insert(0, cfg("zero"));
        slots.insert(MAX_SLOTS + 1, cfg("over"));
        slots.insert(MAX_SLOTS, cfg("last"));
        slots.insert_value(5, &json!("not a record"));
        slots.insert_value(6, &json!({"lora": "x.safetensors"}));

        let indices: Vec<usize> = slots.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![6, MAX_SLOTS]);
        assert_eq!(slots.len(), 2);
    }
}
