//! User profile and per-source pool settings.

use serde::{Deserialize, Serialize};

/// A user's stated interests, used by the profile-path scorer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: String,
    pub interested_categories: Vec<String>,
    pub research_keywords: Vec<String>,
    pub preference_description: Option<String>,
    pub onboarding_completed: bool,
}

/// How `show_mode` gates a source's feed between pool-only and everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowMode {
    Pool,
    All,
}

/// Per (user, source_key) feed shaping knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourcePoolSettings {
    pub user_id: String,
    pub source_key: String,
    pub pool_ratio: f64,
    pub max_pool_size: i32,
    pub show_mode: ShowMode,
    pub filter_no_content: bool,
}

impl DataSourcePoolSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.pool_ratio) {
            return Err("pool_ratio must be within [0, 1]".into());
        }
        if !(10..=10_000).contains(&self.max_pool_size) {
            return Err("max_pool_size must be within [10, 10000]".into());
        }
        Ok(())
    }
}
