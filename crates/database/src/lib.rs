mod character;
mod dice_roll;
mod error;
mod memory;
mod participant;
mod postgres;
mod repository;
mod session;
mod user;

pub use character::Character;
pub use dice_roll::DiceRoll;
pub use error::{RepositoryError, RepositoryResult};
pub use memory::MemoryRepository;
pub use participant::{ParticipantRole, SessionParticipant};
pub use postgres::{PgRepository, PostgresClient};
pub use repository::Repository;
pub use session::GameSession;
pub use user::User;
