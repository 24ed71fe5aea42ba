//! Resource operations: thin orchestration over the repository and the
//! permission resolver. Every operation follows the same order (input
//! shape, existence, permission, business invariants, mutation) so a 404
//! never hides behind a 403 and vice versa.

pub mod characters;
pub mod participants;
pub mod rolls;
pub mod sessions;
pub mod users;
