use serde::Serialize;

use crate::models::AuthUser;

/// Local sign-in flag. Any user record is accepted; there is no token or expiry.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn new(user: Option<AuthUser>, is_authenticated: bool) -> Self {
        Self {
            user,
            is_authenticated,
        }
    }

    pub fn login(&mut self, user: AuthUser) {
        self.user = Some(user);
        self.is_authenticated = true;
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }
}
