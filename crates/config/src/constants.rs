//! Centralized constants for the credit scoring service
//!
//! Single source of truth for default values used across the codebase.

/// Credit score bounds and fallback
pub mod scores {
    /// Score returned whenever a prediction cannot be computed
    pub const DEFAULT_SCORE: f64 = 650.0;

    /// Lowest score a computed prediction is clamped to
    pub const MIN_SCORE: f64 = 300.0;

    /// Highest score a computed prediction is clamped to
    pub const MAX_SCORE: f64 = 900.0;
}

/// Model artifact locations (relative to the working directory)
pub mod artifacts {
    pub const MODEL_PATH: &str = "models/gradient_boosting_model.json";
    pub const SCALER_PATH: &str = "models/scaler.json";
}

/// Relational store defaults
pub mod database {
    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 3306;
    pub const USER: &str = "root";
    pub const DATABASE: &str = "creditai";

    /// Table read by the testcase and score endpoints and written by submissions
    pub const RECORDS_TABLE: &str = "testcases";

    /// Table holding social media analysis rows
    pub const SOCIAL_TABLE: &str = "socialmedia";
}

/// Service endpoints
pub mod endpoints {
    /// Google Generative Language API
    pub const GEMINI_DEFAULT: &str = "https://generativelanguage.googleapis.com";

    /// Default chat model
    pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

    /// Development frontend origin
    pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";
}

/// Chat relay defaults
pub mod chat {
    /// Conversation key used when the payload carries no business_id
    pub const FALLBACK_SESSION_KEY: &str = "unknown";

    /// Business id served from the built-in demo profile
    pub const DEMO_BUSINESS_ID: &str = "XYZ123";

    pub const MAX_CONVERSATIONS: usize = 1000;
    pub const IDLE_TIMEOUT_SECS: u64 = 3600;
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}
