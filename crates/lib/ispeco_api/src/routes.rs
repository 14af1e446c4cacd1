//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const POST_AUTH_LOGOUT_ALL: &str = "/auth/logout-all";

pub const USERS_ME: &str = "/users/me";
pub const POST_USERS_ME_PASSWORD: &str = "/users/me/password";

pub const CAMERAS: &str = "/cameras";
pub const GET_CAMERAS_SHARED: &str = "/cameras/shared";
pub const CAMERAS_ID: &str = "/cameras/{id}";
pub const GET_CAMERAS_ID_URL: &str = "/cameras/{id}/url";
pub const GET_CAMERAS_ID_PASSWORD: &str = "/cameras/{id}/password";
pub const CAMERAS_ID_SETUP: &str = "/cameras/{id}/setup";

pub const USER_ACCESS: &str = "/users/me/user-access";
pub const USER_ACCESS_ID: &str = "/users/me/user-access/{id}";

pub const WS_LIVE_STREAM: &str = "/ws/live_stream/{camera_id}";
