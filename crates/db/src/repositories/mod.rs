//! Repository layer over the database entities.

pub mod community;
pub mod feed;
pub mod moderation;
pub mod post;
pub mod user;

pub use community::CommunityRepository;
pub use feed::FeedRepository;
pub use moderation::{DecisionWrite, ModerationRepository};
pub use post::PostRepository;
pub use user::UserRepository;
