mod extractor;
mod users_client;

pub use extractor::CurrentUser;
pub use users_client::{PublicProfile, RolesResponse, UserServiceClient};
