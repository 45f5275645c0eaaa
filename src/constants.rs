pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";
pub const USER_AGENT: &str = concat!("bragging-rights/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_REPO_OWNER: &str = "lolidrk";
pub const DEFAULT_REPO_NAME: &str = "bragging-rights-log";
pub const DEFAULT_REPO_BRANCH: &str = "main";

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_ASSETS_DIR: &str = "assets";
pub const DEFAULT_API_SERVICE_NAME: &str = "bragging-rights";

// github caps `per_page` at 100 for the commits listing
pub const MAX_COMMITS_PER_PAGE: u8 = 100;
pub const DEFAULT_FILE_LOOKUP_DELAY_MS: u64 = 100;
pub const DEFAULT_DEBUG_TRACE_LIMIT: u32 = 50;

/// Files with these extensions are never attributed in file mode
pub const SKIPPED_EXTENSIONS: &[&str] = &[".md", ".txt", ".gitignore", ".yml", ".yaml"];

/// How many processed records the diagnostic panel lists
pub const RECENT_RECORDS_SHOWN: usize = 10;

pub const AVATAR_ROUTE: &str = "/avatars";
pub const DEFAULT_AVATAR: &str = "/avatars/default.svg";

pub const LEADERBOARD_FETCH_ERROR: &str = "Failed to fetch leaderboard data";
