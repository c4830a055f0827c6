use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::types::HashPart;

fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Hash ordered identity parts into a source-scoped record id.
pub fn record_id(source_id: &str, parts: &[HashPart]) -> String {
    let digest = stable_hash_with(|hasher| {
        source_id.hash(hasher);
        for part in parts {
            part.hash(hasher);
        }
    });
    format!("{source_id}::{digest:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_is_stable_and_order_sensitive() {
        let parts = vec!["a".to_string(), "b".to_string()];
        let swapped = vec!["b".to_string(), "a".to_string()];
        assert_eq!(record_id("news", &parts), record_id("news", &parts));
        assert_ne!(record_id("news", &parts), record_id("news", &swapped));
        assert_ne!(record_id("news", &parts), record_id("social", &parts));
        assert!(record_id("news", &parts).starts_with("news::"));
    }
}
