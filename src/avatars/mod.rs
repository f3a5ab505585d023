pub mod gravatar;
pub mod services;

pub use gravatar::gravatar_url;
pub use services::{store_avatar, AvatarUpload, AVATAR_SIZE};
