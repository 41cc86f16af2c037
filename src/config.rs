use crate::form::DEFAULT_FORM_WINDOW;
use crate::season::SplitYear;

const MAX_FORM_WINDOW: usize = 50;
const MAX_THREADS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub form_window: usize,
    /// Month a season starts in; 1 gives calendar-year seasons.
    pub season_start_month: u32,
    pub parallel_seasons: bool,
    /// Worker threads for season replay; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            form_window: DEFAULT_FORM_WINDOW,
            season_start_month: 1,
            parallel_seasons: true,
            threads: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `APP_FORM_WINDOW`, `APP_SEASON_START_MONTH`,
    /// `APP_PARALLEL_SEASONS` and `APP_FEATURE_THREADS` through `lookup`.
    /// Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(window) = lookup("APP_FORM_WINDOW").and_then(|v| parse_usize(&v)) {
            cfg.form_window = window.clamp(1, MAX_FORM_WINDOW);
        }
        if let Some(month) = lookup("APP_SEASON_START_MONTH").and_then(|v| parse_usize(&v)) {
            cfg.season_start_month = month.clamp(1, 12) as u32;
        }
        if let Some(flag) = lookup("APP_PARALLEL_SEASONS").and_then(|v| parse_bool(&v)) {
            cfg.parallel_seasons = flag;
        }
        if let Some(threads) = lookup("APP_FEATURE_THREADS").and_then(|v| parse_usize(&v)) {
            cfg.threads = Some(threads.clamp(1, MAX_THREADS));
        }
        cfg
    }

    /// Command-line overrides: `--form-window`, `--season-start-month`,
    /// `--threads` and `--serial`.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(window) = arg_value(args, "--form-window").and_then(|v| parse_usize(&v)) {
            self.form_window = window.clamp(1, MAX_FORM_WINDOW);
        }
        if let Some(month) = arg_value(args, "--season-start-month").and_then(|v| parse_usize(&v))
        {
            self.season_start_month = month.clamp(1, 12) as u32;
        }
        if let Some(threads) = arg_value(args, "--threads").and_then(|v| parse_usize(&v)) {
            self.threads = Some(threads.clamp(1, MAX_THREADS));
        }
        if has_flag(args, "--serial") {
            self.parallel_seasons = false;
        }
    }

    pub fn season_key(&self) -> SplitYear {
        SplitYear::new(self.season_start_month)
    }
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// Value of `--name value` or `--name=value`.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn parse_usize(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
