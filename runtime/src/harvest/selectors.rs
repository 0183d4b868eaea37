//! XPath selectors for the post feed.
//!
//! These are coupled to the site's undocumented markup and break when it
//! changes. Card-scoped selectors start with `.` and are evaluated relative
//! to the card element.

/// Every rendered post card.
pub const CARDS: &str = r#"//article[@role="article"]"#;

pub const PERMALINK: &str = ".//a[contains(@href, '/status/')]";

/// First non-handle, non-separator span inside the name block.
pub const AUTHOR_NAME: &str = ".//div[@data-testid='User-Name']//span[not(starts-with(text(),'@')) and string-length(text()) > 0 and not(contains(text(), '·'))][1]";

pub const HANDLE: &str = ".//div[@data-testid='User-Name']//span[starts-with(text(),'@')]";

pub const BODY: &str = ".//div[@data-testid='tweetText']";

pub const TIME: &str = ".//time";

/// Element carrying the aggregate accessible label.
pub const METRICS_LABEL: &str =
    ".//div[@role='group' and @aria-label] | .//div[@data-testid='analyticsButton']";

pub const REPLY_COUNT: &str = ".//*[@data-testid='reply']//span[@data-testid='app-text-transition-container' or contains(@data-testid, 'count')]";

pub const REPOST_COUNT: &str = ".//*[@data-testid='retweet']//span[@data-testid='app-text-transition-container' or contains(@data-testid, 'count')]";

pub const LIKE_COUNT: &str = ".//*[@data-testid='like']//span[@data-testid='app-text-transition-container' or contains(@data-testid, 'count')]";

pub const VIEWS_CONTROL: &str = ".//*[contains(@aria-label, 'views')]";

// ── Login and search ────────────────────────────────────────────────────────

pub const LOGIN_USERNAME: &str =
    "//input[@autocomplete='username' or @name='text' or @data-testid='ocf-text-input']";

/// Second identifier prompt shown for unusual-activity checks.
pub const LOGIN_CONFIRM: &str = "//input[@autocomplete='username' and @name='text']";

pub const LOGIN_PASSWORD: &str = "//input[@name='password']";

pub const SEARCH_INPUT: &str = r#"//input[@data-testid="SearchBox_Search_Input"]"#;

pub const LATEST_TAB: &str = r#"//a[contains(@href, "f=live")] | //span[text()="Latest"]/ancestor::a"#;
