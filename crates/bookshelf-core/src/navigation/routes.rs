/// Login entry point; also where a rejected credential sends the client.
pub const LOGIN_PATH: &str = "/login";

/// Landing page for redirects that are not about authentication.
pub const HOME_PATH: &str = "/";

/// Query parameter carrying the originally requested location.
pub const REDIRECT_PARAM: &str = "redirect";

/// Access requirement declared on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteAccess {
    #[default]
    Public,
    RequiresAuth,
    /// Signed-in administrators only.
    RequiresAdmin,
    /// Only meaningful to visitors who are not signed in.
    GuestOnly,
}

impl RouteAccess {
    pub fn requires_auth(self) -> bool {
        matches!(self, RouteAccess::RequiresAuth | RouteAccess::RequiresAdmin)
    }

    pub fn requires_admin(self) -> bool {
        matches!(self, RouteAccess::RequiresAdmin)
    }

    pub fn is_guest_only(self) -> bool {
        matches!(self, RouteAccess::GuestOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// Pattern such as `/books/:id`.
    pub pattern: &'static str,
    pub access: RouteAccess,
}

impl Route {
    pub const fn new(name: &'static str, pattern: &'static str, access: RouteAccess) -> Self {
        Self {
            name,
            pattern,
            access,
        }
    }

    /// Does `path` (without query string) match this route's pattern?
    pub fn matches(&self, path: &str) -> bool {
        let mut expected = segments(self.pattern);
        let mut actual = segments(path);
        loop {
            match (expected.next(), actual.next()) {
                (None, None) => return true,
                (Some(e), Some(a)) => {
                    if e.starts_with(':') {
                        if a.is_empty() {
                            return false;
                        }
                    } else if e != a {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strip query string and fragment from a location.
pub fn path_of(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}

const DEFAULT_ROUTES: &[Route] = &[
    Route::new("home", "/", RouteAccess::Public),
    Route::new("login", "/login", RouteAccess::GuestOnly),
    Route::new("register", "/register", RouteAccess::GuestOnly),
    Route::new("books", "/books", RouteAccess::Public),
    Route::new("book-detail", "/books/:id", RouteAccess::Public),
    Route::new("my-library", "/my-library", RouteAccess::RequiresAuth),
    Route::new("favorites", "/favorites", RouteAccess::RequiresAuth),
    Route::new("profile", "/profile", RouteAccess::RequiresAuth),
    Route::new("admin", "/admin", RouteAccess::RequiresAdmin),
    Route::new("admin-book-new", "/admin/books/new", RouteAccess::RequiresAdmin),
    Route::new("admin-book-edit", "/admin/books/:id/edit", RouteAccess::RequiresAdmin),
    Route::new("admin-authors", "/admin/authors", RouteAccess::RequiresAdmin),
];

/// Declared routes, matched in order. Unknown paths are public.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            routes: DEFAULT_ROUTES.to_vec(),
        }
    }
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve(&self, location: &str) -> Option<&Route> {
        let path = path_of(location);
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn access_for(&self, location: &str) -> RouteAccess {
        self.resolve(location).map(|r| r.access).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_matching() {
        let detail = Route::new("book-detail", "/books/:id", RouteAccess::Public);
        assert!(detail.matches("/books/12"));
        assert!(detail.matches("/books/12/"));
        assert!(!detail.matches("/books"));
        assert!(!detail.matches("/books/12/edit"));

        let home = Route::new("home", "/", RouteAccess::Public);
        assert!(home.matches("/"));
        assert!(home.matches(""));
        assert!(!home.matches("/books"));
    }

    #[test]
    fn test_path_of_strips_query_and_fragment() {
        assert_eq!(path_of("/books?q=dune"), "/books");
        assert_eq!(path_of("/admin#top"), "/admin");
        assert_eq!(path_of("/profile"), "/profile");
    }

    #[test]
    fn test_default_table_access() {
        let table = RouteTable::default();
        assert_eq!(table.access_for("/login"), RouteAccess::GuestOnly);
        assert_eq!(table.access_for("/my-library?sort=title"), RouteAccess::RequiresAuth);
        assert_eq!(table.access_for("/admin/books/7/edit"), RouteAccess::RequiresAdmin);
        assert_eq!(table.access_for("/books/7"), RouteAccess::Public);
        assert_eq!(table.access_for("/nowhere"), RouteAccess::Public);
        assert_eq!(table.resolve("/admin/books/new").map(|r| r.name), Some("admin-book-new"));
    }

    #[test]
    fn test_admin_implies_auth() {
        assert!(RouteAccess::RequiresAdmin.requires_auth());
        assert!(RouteAccess::RequiresAuth.requires_auth());
        assert!(!RouteAccess::GuestOnly.requires_auth());
        assert!(!RouteAccess::RequiresAuth.requires_admin());
    }
}
