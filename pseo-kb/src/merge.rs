//! JSON merge helpers for profile updates

use serde_json::Value;

/// Merge `update` into `base`.
///
/// Objects merge key by key and recursively; any other value in `update`
/// replaces the one in `base` wholesale. Keys only present in `base` survive.
pub fn deep_merge(base: &mut Value, update: Value) {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    Some(existing) => *existing = value,
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, update) => *base = update,
    }
}

/// Like [`deep_merge`], but values in `overlay` that are null or empty
/// (`""`, `[]`, `{}`) never displace what `base` already has.
pub fn overlay_non_empty(base: &mut Value, overlay: &Value) {
    let Value::Object(overlay_map) = overlay else {
        if !is_blank(overlay) {
            *base = overlay.clone();
        }
        return;
    };

    if !base.is_object() {
        *base = Value::Object(Default::default());
    }
    let Value::Object(base_map) = base else {
        return;
    };

    for (key, value) in overlay_map {
        if is_blank(value) {
            continue;
        }
        match base_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                overlay_non_empty(existing, value)
            }
            Some(existing) => *existing = value.clone(),
            None => {
                base_map.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Null, empty string, empty array or empty object
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_preserves_untouched_keys() {
        let mut profile = json!({
            "category": "Image generator",
            "pricing": {"known": true, "estimate": "$10/month", "tiers": ["basic"]},
            "strengths": ["fast"]
        });
        let update = json!({
            "pricing": {"estimate": "$12/month"},
            "strengths": ["cheap"],
            "positioning": "Prosumer"
        });

        deep_merge(&mut profile, update);

        assert_eq!(profile["category"], "Image generator");
        assert_eq!(profile["pricing"]["known"], true);
        assert_eq!(profile["pricing"]["tiers"], json!(["basic"]));
        assert_eq!(profile["pricing"]["estimate"], "$12/month");
        assert_eq!(profile["strengths"], json!(["cheap"]));
        assert_eq!(profile["positioning"], "Prosumer");
    }

    #[test]
    fn test_deep_merge_replaces_non_maps_wholesale() {
        let mut profile = json!({"features": {"nsfw_support": false}});
        deep_merge(&mut profile, json!({"features": "unknown"}));
        assert_eq!(profile["features"], "unknown");

        deep_merge(&mut profile, json!({"features": {"nsfw_support": true}}));
        assert_eq!(profile["features"], json!({"nsfw_support": true}));
    }

    #[test]
    fn test_overlay_skips_blank_values() {
        let mut profile = json!({
            "category": "Video tool",
            "pricing": {"estimate": "$30/month", "free_trial": true}
        });
        let research = json!({
            "category": "",
            "pricing": {"estimate": "$35/month", "free_trial": null},
            "weaknesses": []
        });

        overlay_non_empty(&mut profile, &research);

        assert_eq!(profile["category"], "Video tool");
        assert_eq!(profile["pricing"]["estimate"], "$35/month");
        assert_eq!(profile["pricing"]["free_trial"], true);
        assert!(profile.get("weaknesses").is_none());
    }
}
