/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Icon source defaults
pub const DEFAULT_ICON_BASE_URL: &str =
    "https://raw.githubusercontent.com/Switcheo/token-icons/main/tokens";
pub const DEFAULT_ICON_EXTENSION: &str = "svg";

// Candidate generation defaults
pub const DEFAULT_MAX_SPLIT_DEPTH: usize = 4;
pub const DEFAULT_EXTRA_FORM_DEPTH: usize = 3;

// Resolver defaults
pub const DEFAULT_ATTEMPT_TIMEOUT: &str = "10s";
pub const DEFAULT_FETCH_TIMEOUT: &str = "15s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "5s";

// Curated filenames the case heuristics cannot guess
pub const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("YIELDUSD", "YieldUSD"),
    ("AMPLUNA", "ampLUNA"),
    ("STLUNA", "stLUNA"),
    ("STOSMO", "stOSMO"),
    ("AXLUSDC", "axlUSDC"),
    ("STATOM", "stATOM"),
    ("WSTETH", "wstETH"),
];
