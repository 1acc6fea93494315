use clap::Parser;
use playscout_core::{ScraperConfig, SeedQuery};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "playscout")]
#[command(about = "Collect app catalog entries for a seed query, with details, into a JSON file")]
#[command(version)]
#[command(after_help = "Examples:
  playscout '[\"loan app\"]' 20 200
  playscout '{\"FINANCE\": \"loan app\"}' 20 200 out/finance.json --proxies good_proxies.txt
  playscout '[{\"term\": \"budget\", \"label\": \"budgeting\"}]' 10 50 --workers 8")]
pub struct Cli {
    /// Seed queries as JSON: ["term", ...], [{"term": .., "label": ..}, ...] or {"label": "term"}
    #[arg(value_name = "QUERIES", value_parser = parse_seeds)]
    pub queries: SeedList,

    /// Maximum new items kept per search term
    #[arg(value_name = "PER_QUERY_LIMIT")]
    pub per_query_limit: usize,

    /// Maximum unique items collected in total
    #[arg(value_name = "TARGET_COUNT")]
    pub target_count: usize,

    /// Output file (default: <output dir>/<label>_details.json)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, env = "PLAYSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Proxy list, one host:port per line
    #[arg(long)]
    pub proxies: Option<PathBuf>,

    /// Concurrent detail fetches
    #[arg(long)]
    pub workers: Option<usize>,

    /// Attempts per search or detail request
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Store interface language
    #[arg(long)]
    pub lang: Option<String>,

    /// Storefront country
    #[arg(long)]
    pub country: Option<String>,

    /// Do nothing if the output file already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// More log output (-v traces playscout, -vv traces everything)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Parsed seed list; a newtype so clap treats it as one value.
#[derive(Debug, Clone)]
pub struct SeedList(pub Vec<SeedQuery>);

fn parse_seeds(raw: &str) -> Result<SeedList, String> {
    SeedQuery::parse_list(raw)
        .map(SeedList)
        .map_err(|e| e.to_string())
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info,playscout=debug",
            1 => "info,playscout=trace",
            _ => "trace",
        }
    }

    /// Seeds in the order given.
    pub fn seeds(&self) -> &[SeedQuery] {
        &self.queries.0
    }

    /// Apply command-line overrides on top of file and env configuration.
    pub fn apply_overrides(&self, mut config: ScraperConfig) -> ScraperConfig {
        if let Some(proxies) = &self.proxies {
            config.proxy.file.clone_from(proxies);
        }
        if let Some(workers) = self.workers {
            config.dispatch.max_workers = workers;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(lang) = &self.lang {
            config.store.lang.clone_from(lang);
        }
        if let Some(country) = &self.country {
            config.store.country.clone_from(country);
        }
        config
    }
}
