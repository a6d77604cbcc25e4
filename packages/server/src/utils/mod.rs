pub mod hash;
pub mod interaction;
pub mod jwt;
pub mod pagination;
pub mod projection;
pub mod recipe;
