use reqwest::Method;

/// Endpoints of the user registration API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
    Refresh,
    Logout,
    Profile,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "/auth/login",
            Endpoint::Register => "/user/register",
            Endpoint::Refresh => "/auth/refresh",
            Endpoint::Logout => "/auth/logout",
            Endpoint::Profile => "/user/profile",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Profile => Method::GET,
            _ => Method::POST,
        }
    }

    /// Login and registration never carry a bearer token
    pub fn is_public(self) -> bool {
        matches!(self, Endpoint::Login | Endpoint::Register)
    }
}
