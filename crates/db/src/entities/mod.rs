//! Database entities.

pub mod community;
pub mod community_member;
pub mod feed_snapshot_item;
pub mod label_import_rule;
pub mod moderation_action;
pub mod moderation_log;
pub mod post;
pub mod post_like;
pub mod report;
pub mod user;

pub use community::Entity as Community;
pub use community_member::Entity as CommunityMember;
pub use feed_snapshot_item::Entity as FeedSnapshotItem;
pub use label_import_rule::Entity as LabelImportRule;
pub use moderation_action::Entity as ModerationAction;
pub use moderation_log::Entity as ModerationLog;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use report::Entity as Report;
pub use user::Entity as User;
