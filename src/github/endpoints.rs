// GitHub API endpoint paths.
// Builds the endpoint strings the stats pipeline requests through the proxy.

/// Page size used for list endpoints.
pub const PER_PAGE: u32 = 100;

/// Endpoint paths for one GitHub account.
///
/// With a token the owned-repo list and profile come from the authenticated
/// `/user` endpoints (which include private repos and collaborations); without
/// one they fall back to the public `/users/{name}` endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    username: String,
    authenticated: bool,
}

impl Endpoints {
    pub fn new(username: impl Into<String>, authenticated: bool) -> Self {
        Self {
            username: username.into(),
            authenticated,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn profile(&self) -> String {
        if self.authenticated {
            "/user".to_string()
        } else {
            format!("/users/{}", self.username)
        }
    }

    /// Every repo the account can see, used for languages and collaborations.
    pub fn owned_repos(&self) -> String {
        if self.authenticated {
            format!("/user/repos?per_page={}&sort=updated&type=all", PER_PAGE)
        } else {
            self.public_repos()
        }
    }

    /// Public repos only, used for star and fork totals.
    pub fn public_repos(&self) -> String {
        format!(
            "/users/{}/repos?per_page={}&sort=updated",
            self.username, PER_PAGE
        )
    }

    pub fn events(&self) -> String {
        format!("/users/{}/events?per_page={}", self.username, PER_PAGE)
    }

    pub fn search_prs(&self) -> String {
        format!("/search/issues?q=author:{}+type:pr", self.username)
    }

    pub fn search_issues(&self) -> String {
        format!("/search/issues?q=author:{}+type:issue", self.username)
    }

    pub fn languages(full_name: &str) -> String {
        format!("/repos/{}/languages", full_name)
    }
}
