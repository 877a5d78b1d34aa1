mod registration;
mod user;

pub use registration::{ApiError, Credentials, RegisteredUser};
pub use user::{UpdateUser, UpdatedUser, User, UserData, UsersPage};
