//! Domain services.

pub mod community;
pub mod feed;
pub mod moderation;
pub mod post;
pub mod report;
pub mod reporter_trust;
pub mod strike;
pub mod trigger;
pub mod trust;

pub use community::{CommunityService, UpsertRuleInput};
pub use feed::{FeedService, SweepOutcome};
pub use moderation::ModerationService;
pub use post::{CreatePostInput, PostService};
pub use report::{CreateReportInput, ReportService};
pub use trigger::{RankTrigger, RebuildQueue};
pub use trust::TrustService;
