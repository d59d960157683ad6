mod middleware;

pub use middleware::{AuthError, RequireUser, USER_ID_HEADER};
