//! Candidate pools: deterministic per-date, per-category buckets.

use chrono::NaiveDate;
use uuid::Uuid;

/// Category predicates used to bucket a day's papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Cs,
    AiMlCvRo,
    Math,
    Physics,
    All,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Cs => "cs",
            FilterType::AiMlCvRo => "ai-ml-cv",
            FilterType::Math => "math",
            FilterType::Physics => "physics",
            FilterType::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cs" => Some(FilterType::Cs),
            "ai-ml-cv" => Some(FilterType::AiMlCvRo),
            "math" => Some(FilterType::Math),
            "physics" => Some(FilterType::Physics),
            "all" => Some(FilterType::All),
            _ => None,
        }
    }

    /// Whether a paper's category set is admitted by this predicate.
    pub fn matches(&self, categories: &[String]) -> bool {
        match self {
            FilterType::Cs => categories.iter().any(|c| c.starts_with("cs.")),
            FilterType::AiMlCvRo => {
                const CORE: [&str; 5] = ["cs.AI", "cs.LG", "cs.CV", "cs.CL", "cs.RO"];
                categories.iter().any(|c| {
                    CORE.contains(&c.as_str()) || CORE.iter().any(|core| c.starts_with(core))
                })
            }
            FilterType::Math => categories.iter().any(|c| c.starts_with("math.")),
            FilterType::Physics => categories.iter().any(|c| {
                c.starts_with("physics.") || c.starts_with("astro-ph.") || c.starts_with("cond-mat.")
            }),
            FilterType::All => true,
        }
    }
}

/// Deterministic UUID for a candidate-pool batch, reproducible across
/// machines so a rebuild on any node targets the same bucket.
pub fn date_to_batch_id(date: NaiveDate) -> Uuid {
    let name = format!("candidate_pool_date_{}", date.format("%Y-%m-%d"));
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// Deterministic UUID for a conference's candidate-pool batch, the static
/// counterpart to [`date_to_batch_id`] used by the per-conference `pool`
/// factory job.
pub fn conference_to_batch_id(conf_id: &str) -> Uuid {
    let name = format!("candidate_pool_conf_{conf_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_to_batch_id_is_stable() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date");
        let a = date_to_batch_id(date);
        let b = date_to_batch_id(date);
        assert_eq!(a, b);
    }

    #[test]
    fn conference_batch_id_is_stable_and_distinct_from_dates() {
        let a = conference_to_batch_id("neurips2025");
        let b = conference_to_batch_id("neurips2025");
        assert_eq!(a, b);
        let date = NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date");
        assert_ne!(a, date_to_batch_id(date));
    }

    #[test]
    fn filter_type_cs_matches_prefix_only() {
        assert!(FilterType::Cs.matches(&["cs.AI".to_string()]));
        assert!(!FilterType::Cs.matches(&["math.OC".to_string()]));
    }

    #[test]
    fn filter_type_ai_ml_cv_matches_core_set() {
        assert!(FilterType::AiMlCvRo.matches(&["cs.CV".to_string()]));
        assert!(!FilterType::AiMlCvRo.matches(&["cs.DB".to_string()]));
    }

    #[test]
    fn filter_type_physics_matches_cross_listed_prefixes() {
        assert!(FilterType::Physics.matches(&["astro-ph.GA".to_string()]));
        assert!(FilterType::Physics.matches(&["cond-mat.str-el".to_string()]));
        assert!(!FilterType::Physics.matches(&["cs.AI".to_string()]));
    }
}
