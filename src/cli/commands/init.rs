//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "directory-sync.toml")]
    pub output: String,

    /// Include the age bracket table and a biobank entry
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing directory-sync configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let mut config_content = Self::generate_minimal_config();
        if self.with_examples {
            config_content.push_str(&Self::generate_examples());
        }

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point store.path at the exported sample rows");
                println!("  3. Set DIRSYNC_TOKEN in your environment or a .env file");
                println!("  4. Validate configuration: directory-sync validate-config");
                println!("  5. Preview the run: directory-sync sync --dry-run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> String {
        r#"# directory-sync configuration
# Publishes biobank sample statistics to the BBMRI-ERIC Directory

# development | staging | production
environment = "development"

[application]
log_level = "info"
dry_run = false

[store]
# JSON array of pre-shaped sample rows
path = "/data/directory-sync/rows.json"
timeout_seconds = 30

[directory]
# rest | graphql
api = "rest"
base_url = "https://directory.bbmri-eric.eu"
token = "${DIRSYNC_TOKEN}"

# National node; derived from each collection ID when omitted
country_code = "DE"

timeout_seconds = 30
tls_verify = true
page_size = 100
batch_size = 1000

# GraphQL only: schema = country_schema_prefix + country code
# country_schema_prefix = "BBMRI-"
# fallback_schema = "ERIC"

[sync]
# Empty means every collection found in the store
collection_ids = []

# Privacy floor: minimum distinct donors behind each published fact
min_donors = 10

# Collections producing more facts are not published
max_facts = 10000

retry_max = 3
retry_interval_seconds = 60

update_collections = true
update_biobanks = true

[logging]
local_enabled = true
local_path = "/var/log/directory-sync"

# daily | hourly
local_rotation = "daily"
"#
        .to_string()
    }

    fn generate_examples() -> String {
        r#"
# Age brackets, in order; overrides the default table
[[sync.age_ranges]]
label = "Infant"
min_years = 0
max_years = 1

[[sync.age_ranges]]
label = "Child"
min_years = 2
max_years = 12

[[sync.age_ranges]]
label = "Adolescent"
min_years = 13
max_years = 17

[[sync.age_ranges]]
label = "Young Adult"
min_years = 18
max_years = 24

[[sync.age_ranges]]
label = "Adult"
min_years = 25
max_years = 44

[[sync.age_ranges]]
label = "Middle-aged"
min_years = 45
max_years = 64

[[sync.age_ranges]]
label = "Aged (65-79 years)"
min_years = 65
max_years = 79

[[sync.age_ranges]]
label = "Aged (>80 years)"
min_years = 80

# Locally maintained biobank attributes
[[biobanks]]
id = "bbmri-eric:ID:DE_example"
name = "Example Biobank"
acronym = "EXB"
url = "https://biobank.example.org"
juridical_person = "Example University Hospital"
contact = "bbmri-eric:contactID:DE_example"
networks = []
"#
        .to_string()
    }
}
