/// Identity attached to a request by the JWT middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
    pub uid: String,
}
