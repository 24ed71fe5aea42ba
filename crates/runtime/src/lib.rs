mod dice;
mod error;
mod permission;
mod principal;

pub mod ops;

pub use dice::{DiceExpression, RolledDice};
pub use error::DomainError;
pub use permission::{Action, Decision, DenyReason, PermissionResolver};
pub use principal::{require_principal, Principal};
