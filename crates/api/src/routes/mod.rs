mod auth;
mod characters;
mod participants;
mod rolls;
mod sessions;
mod users;

pub use auth::auth_routes;
pub use characters::character_routes;
pub use participants::participant_routes;
pub use rolls::roll_routes;
pub use sessions::session_routes;
pub use users::user_routes;
