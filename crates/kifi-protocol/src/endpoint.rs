/// Server paths used by the background page.
pub mod endpoints {
    pub const START: &str = "/kifi/start";
    pub const EVENTS: &str = "/users/events";
    pub const BOOKMARKS_ADD: &str = "/bookmarks/add";
    pub const BOOKMARKS_REMOVE: &str = "/bookmarks/remove";
    pub const BOOKMARKS_PRIVATE: &str = "/bookmarks/private";
    pub const BOOKMARKS_CHECK: &str = "/bookmarks/check";
    pub const SEARCH: &str = "/search";
    pub const COMMENTS_FOLLOW: &str = "/comments/follow";
    pub const COMMENTS_ADD: &str = "/comments/add";
    pub const COMMENTS_PUBLIC: &str = "/comments/public";
    pub const MESSAGE_THREADS: &str = "/messages/threads";
    pub const FRIENDS: &str = "/users/friends";
    pub const SLIDER: &str = "/users/slider";
    pub const SLIDER_UPDATES: &str = "/users/slider/updates";

    /// Interactive login page opened in a popup.
    pub const AUTHENTICATE_FACEBOOK: &str = "/authenticate/facebook";
    /// Page the login popup lands on once the server has set its cookie.
    pub const LOGIN_CALLBACK: &str = "/#_=_";
    /// Page that clears the server-side session.
    pub const SESSION_END: &str = "/session/end";
    /// Prefix of the server's redirect service.
    pub const REDIRECT: &str = "/r/";
}

/// `http://{server}{path}`
pub fn server_url(server: &str, path: &str) -> String {
    format!("http://{server}{path}")
}
