//! Allow/deny lists that decide which settings take part in export and import.
//!
//! Installations extend the lists through [`FilterListsBuilder`]. Every list
//! has a current name and a legacy alias; both are applied, and the legacy
//! result is unioned into the current one when the builder is finished, so
//! queries never re-run the mutators.

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Core setting names that are preselected by the `default` import mode.
pub const DEFAULT_IMPORT_ALLOWLIST: &[&str] = &[
    "admin_email",
    "advanced_edit",
    "avatar_default",
    "avatar_rating",
    "blacklist_keys",
    "blogdescription",
    "blogname",
    "blog_charset",
    "blog_public",
    "blog_upload_space",
    "category_base",
    "category_children",
    "close_comments_days_old",
    "close_comments_for_old_posts",
    "comments_notify",
    "comments_per_page",
    "comment_max_links",
    "comment_moderation",
    "comment_order",
    "comment_registration",
    "comment_whitelist",
    "comment_previously_approved",
    "cron",
    "date_format",
    "default_category",
    "default_comments_page",
    "default_comment_status",
    "default_email_category",
    "default_link_category",
    "default_pingback_flag",
    "default_ping_status",
    "default_post_format",
    "default_role",
    "disallowed_keys",
    "gmt_offset",
    "gzipcompression",
    "hack_file",
    "html_type",
    "image_default_align",
    "image_default_link_type",
    "image_default_size",
    "large_size_h",
    "large_size_w",
    "links_recently_updated_append",
    "links_recently_updated_prepend",
    "links_recently_updated_time",
    "links_updated_date_format",
    "link_manager_enabled",
    "mailserver_login",
    "mailserver_pass",
    "mailserver_port",
    "mailserver_url",
    "medium_size_h",
    "medium_size_w",
    "moderation_keys",
    "moderation_notify",
    "ms_robotstxt",
    "ms_robotstxt_sitemap",
    "nav_menu_options",
    "page_comments",
    "page_for_posts",
    "page_on_front",
    "permalink_structure",
    "ping_sites",
    "posts_per_page",
    "posts_per_rss",
    "recently_activated",
    "recently_edited",
    "require_name_email",
    "rss_use_excerpt",
    "show_avatars",
    "show_on_front",
    "sidebars_widgets",
    "start_of_week",
    "sticky_posts",
    "subscription_options",
    "tag_base",
    "theme_switched",
    "thread_comments",
    "thread_comments_depth",
    "thumbnail_crop",
    "thumbnail_size_h",
    "thumbnail_size_w",
    "timezone_string",
    "time_format",
    "uninstall_plugins",
    "uploads_use_yearmonth_folders",
    "upload_path",
    "upload_url_path",
    "users_can_register",
    "use_balanceTags",
    "use_smilies",
    "use_trackback",
    "widget_archives",
    "widget_categories",
    "widget_image",
    "widget_meta",
    "widget_nav_menu",
    "widget_recent-comments",
    "widget_recent-posts",
    "widget_rss",
    "widget_rss_links",
    "widget_search",
    "widget_text",
    "widget_top-posts",
    "WPLANG",
];

/// Resolved filter lists, built once per operation.
#[derive(Debug, Clone, Default)]
pub struct FilterLists {
    export_denylist: Vec<String>,
    export_denylist_patterns: Vec<Regex>,
    import_allowlist: Vec<String>,
    import_denylist: Vec<String>,
    import_denylist_patterns: Vec<Regex>,
}

impl FilterLists {
    /// Lists with the stock allow-list and nothing denied.
    pub fn standard() -> Self {
        FilterListsBuilder::new().build()
    }

    /// Start a builder seeded with the stock lists.
    pub fn builder() -> FilterListsBuilder {
        FilterListsBuilder::new()
    }

    pub fn export_denylist(&self) -> &[String] {
        &self.export_denylist
    }

    pub fn import_allowlist(&self) -> &[String] {
        &self.import_allowlist
    }

    pub fn import_denylist(&self) -> &[String] {
        &self.import_denylist
    }

    /// Whether the exporter must leave `name` out (list or pattern).
    pub fn is_export_denied(&self, name: &str) -> bool {
        self.export_denylist.iter().any(|n| n == name)
            || self.export_denylist_patterns.iter().any(|re| re.is_match(name))
    }

    /// Whether `name` is on the import deny-list.
    pub fn is_import_denied_by_list(&self, name: &str) -> bool {
        self.import_denylist.iter().any(|n| n == name)
    }

    /// Whether an import deny pattern matches `name`.
    pub fn is_import_denied_by_pattern(&self, name: &str) -> bool {
        self.import_denylist_patterns.iter().any(|re| re.is_match(name))
    }

    /// Whether the importer must refuse `name` (list or pattern).
    pub fn is_import_denied(&self, name: &str) -> bool {
        self.is_import_denied_by_list(name) || self.is_import_denied_by_pattern(name)
    }

    /// Whether `name` is preselected by the default import mode.
    pub fn is_import_allowed(&self, name: &str) -> bool {
        self.import_allowlist.iter().any(|n| n == name)
    }
}

type Mutator = Box<dyn FnOnce(Vec<String>) -> Vec<String>>;

/// One extension point: a list under its current name plus its legacy alias.
struct HookPoint {
    seed: Vec<String>,
    current: Vec<Mutator>,
    legacy: Vec<Mutator>,
}

impl HookPoint {
    fn new(seed: Vec<String>) -> Self {
        Self {
            seed,
            current: Vec::new(),
            legacy: Vec::new(),
        }
    }

    /// Run the current mutators, feed their result through the legacy ones,
    /// then union the two.
    fn resolve(self) -> Vec<String> {
        let current = self.current.into_iter().fold(self.seed, |list, f| f(list));
        let legacy = self.legacy.into_iter().fold(current.clone(), |list, f| f(list));
        let mut resolved = Vec::with_capacity(current.len().max(legacy.len()));
        for name in current.into_iter().chain(legacy) {
            if !resolved.contains(&name) {
                resolved.push(name);
            }
        }
        resolved
    }
}

/// Collects list mutators and deny patterns, then resolves them in [`build`].
///
/// Every mutator receives the list as it stands and returns a replacement.
///
/// ```ignore
/// let filters = FilterLists::builder()
///     .import_denylist(|mut list| { list.push("siteurl".into()); list })
///     .import_denylist_pattern(DenyPattern::parse("/^mailserver_/")?)
///     .build();
/// ```
///
/// [`build`]: FilterListsBuilder::build
pub struct FilterListsBuilder {
    export_denylist: HookPoint,
    import_allowlist: HookPoint,
    import_denylist: HookPoint,
    export_patterns: Vec<DenyPattern>,
    import_patterns: Vec<DenyPattern>,
}

impl Default for FilterListsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterListsBuilder {
    pub fn new() -> Self {
        Self {
            export_denylist: HookPoint::new(Vec::new()),
            import_allowlist: HookPoint::new(
                DEFAULT_IMPORT_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            ),
            import_denylist: HookPoint::new(Vec::new()),
            export_patterns: Vec::new(),
            import_patterns: Vec::new(),
        }
    }

    pub fn export_denylist(mut self, f: impl FnOnce(Vec<String>) -> Vec<String> + 'static) -> Self {
        self.export_denylist.current.push(Box::new(f));
        self
    }

    /// Legacy alias of [`export_denylist`](Self::export_denylist) ("blacklist").
    pub fn legacy_export_denylist(
        mut self,
        f: impl FnOnce(Vec<String>) -> Vec<String> + 'static,
    ) -> Self {
        self.export_denylist.legacy.push(Box::new(f));
        self
    }

    pub fn import_allowlist(mut self, f: impl FnOnce(Vec<String>) -> Vec<String> + 'static) -> Self {
        self.import_allowlist.current.push(Box::new(f));
        self
    }

    /// Legacy alias of [`import_allowlist`](Self::import_allowlist) ("whitelist").
    pub fn legacy_import_allowlist(
        mut self,
        f: impl FnOnce(Vec<String>) -> Vec<String> + 'static,
    ) -> Self {
        self.import_allowlist.legacy.push(Box::new(f));
        self
    }

    pub fn import_denylist(mut self, f: impl FnOnce(Vec<String>) -> Vec<String> + 'static) -> Self {
        self.import_denylist.current.push(Box::new(f));
        self
    }

    /// Legacy alias of [`import_denylist`](Self::import_denylist) ("blacklist").
    pub fn legacy_import_denylist(
        mut self,
        f: impl FnOnce(Vec<String>) -> Vec<String> + 'static,
    ) -> Self {
        self.import_denylist.legacy.push(Box::new(f));
        self
    }

    pub fn export_denylist_pattern(mut self, pattern: DenyPattern) -> Self {
        self.export_patterns.push(pattern);
        self
    }

    pub fn legacy_export_denylist_pattern(self, pattern: DenyPattern) -> Self {
        self.export_denylist_pattern(pattern)
    }

    pub fn import_denylist_pattern(mut self, pattern: DenyPattern) -> Self {
        self.import_patterns.push(pattern);
        self
    }

    pub fn legacy_import_denylist_pattern(self, pattern: DenyPattern) -> Self {
        self.import_denylist_pattern(pattern)
    }

    pub fn build(self) -> FilterLists {
        FilterLists {
            export_denylist: self.export_denylist.resolve(),
            export_denylist_patterns: self.export_patterns.into_iter().map(|p| p.0).collect(),
            import_allowlist: self.import_allowlist.resolve(),
            import_denylist: self.import_denylist.resolve(),
            import_denylist_patterns: self.import_patterns.into_iter().map(|p| p.0).collect(),
        }
    }
}

/// A compiled deny pattern.
#[derive(Debug, Clone)]
pub struct DenyPattern(Regex);

impl DenyPattern {
    /// Compile a pattern given either bare (`^home$`) or in delimited form
    /// with trailing flags (`/^home$/i`, `#^site#`).
    ///
    /// Delimited patterns honour the `i`, `m`, `s` and `x` flags.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] when the pattern is empty or
    /// does not compile.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            message,
        };

        let trimmed = raw.trim();
        let (body, flags) = split_delimited(trimmed).unwrap_or((trimmed, ""));
        if body.is_empty() {
            return Err(invalid("pattern is empty".to_string()));
        }

        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => return Err(invalid(format!("unsupported flag '{other}'"))),
            };
        }
        builder
            .build()
            .map(DenyPattern)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

/// Split `/body/flags` into its parts. Only the usual punctuation
/// delimiters are recognised; anything else is treated as a bare pattern.
fn split_delimited(raw: &str) -> Option<(&str, &str)> {
    let delim = raw.chars().next()?;
    if !matches!(delim, '/' | '#' | '~' | '!' | '@' | '%' | '+' | ';' | '`') {
        return None;
    }
    let rest = &raw[delim.len_utf8()..];
    let end = rest.rfind(delim)?;
    let (body, tail) = (&rest[..end], &rest[end + delim.len_utf8()..]);
    tail.chars()
        .all(|c| c.is_ascii_alphabetic())
        .then_some((body, tail))
}
