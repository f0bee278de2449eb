// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT + organization membership)

pub mod protected;
pub mod public;
