pub const QUIZ_INDEX_URL: &str = "/q/";
pub const CATEGORY_LIST_URL: &str = "/q/category/";
pub const PROGRESS_URL: &str = "/q/progress/";
pub const LOGIN_URL: &str = "/accounts/login/";
pub const LOGOUT_URL: &str = "/accounts/logout/";
pub const REGISTER_URL: &str = "/accounts/register/";

pub const SESSION_COOKIE_NAME: &str = "quiz_session";

pub fn category_url(name: &str) -> String {
    format!("/q/category/{}/", urlencoding::encode(name))
}

pub fn quiz_url(slug: &str) -> String {
    format!("/q/{slug}/")
}

pub fn take_url(slug: &str) -> String {
    format!("/q/{slug}/take/")
}
