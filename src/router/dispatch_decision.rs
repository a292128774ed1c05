//! Model name → upstream family + pool routing (`spec.md` §4.5).

use crate::dispatch::Family;
use crate::pool::PoolKind;

const V3_MODEL_PREFIX: &str = "gemini-3";

/// Antigravity-tagged models (configured via `providers.antigravity.model_list`)
/// route to the Antigravity path; everything else goes through Cloud Code,
/// on the V3 pool when the model is in the `gemini-3` family.
pub fn route(model: &str, antigravity_model_list: &[String]) -> Family {
    if antigravity_model_list.iter().any(|m| m == model) {
        return Family::Antigravity;
    }
    if model.starts_with(V3_MODEL_PREFIX) {
        Family::CloudCode(PoolKind::V3)
    } else {
        Family::CloudCode(PoolKind::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antigravity_listed_model_routes_to_antigravity() {
        let list = vec!["claude-sonnet-4-5-thinking".to_string()];
        assert_eq!(route("claude-sonnet-4-5-thinking", &list), Family::Antigravity);
    }

    #[test]
    fn gemini3_model_routes_to_v3_pool() {
        assert_eq!(route("gemini-3-flash", &[]), Family::CloudCode(PoolKind::V3));
    }

    #[test]
    fn other_model_routes_to_general_pool() {
        assert_eq!(route("gemini-2.5-pro", &[]), Family::CloudCode(PoolKind::General));
    }
}
