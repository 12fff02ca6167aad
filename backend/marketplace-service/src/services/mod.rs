pub mod authz;
pub mod conversations;
pub mod identity;
pub mod moderation;
pub mod oauth;
pub mod storage;
