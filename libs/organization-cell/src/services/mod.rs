pub mod analytics;
pub mod organization;

pub use analytics::OrganizationAnalyticsService;
pub use organization::OrganizationService;
