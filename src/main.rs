use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jobfeed::config::{Config, ConfigArgs};
use jobfeed::fetch::{HttpListingSource, ListingSource, PageRequest};
use jobfeed::filter::{FilterField, parse_filter_arg};
use jobfeed::logging::{LogTarget, init_logging};
use jobfeed::models::ListingRecord;
use jobfeed::session::Session;
use jobfeed::store::{StoreEvent, StoreState};
use jobfeed::tui::{self, truncate};

#[derive(Parser)]
#[command(name = "jobfeed")]
#[command(about = "Browse, filter and page through remote job listings")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse listings with infinite scrolling (default)
    Browse,

    /// Fetch a single page and print it
    Page {
        /// Page number, starting at 1
        #[arg(default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load pages and print the listings matching the filters
    List {
        /// Number of pages to load
        #[arg(short, long, default_value = "3")]
        pages: u32,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Role contains
    #[arg(long)]
    role: Option<String>,

    /// Company name contains
    #[arg(long)]
    company: Option<String>,

    /// Location contains
    #[arg(long)]
    location: Option<String>,

    /// Only remote listings
    #[arg(long)]
    remote: bool,

    /// Job description mentions
    #[arg(long)]
    tech_stack: Option<String>,

    /// Minimum years of experience
    #[arg(long)]
    min_experience: Option<String>,

    /// Minimum base pay
    #[arg(long, alias = "min-base-pay")]
    min_salary: Option<String>,

    /// Employee count contains
    #[arg(long)]
    employees: Option<String>,

    /// Any filter as NAME=VALUE, e.g. minBasePay=40 (repeatable)
    #[arg(long = "filter", value_name = "NAME=VALUE", value_parser = parse_filter_arg)]
    extra: Vec<(FilterField, String)>,
}

impl FilterArgs {
    fn into_events(self) -> Vec<StoreEvent> {
        let mut set = vec![
            (FilterField::Role, self.role),
            (FilterField::CompanyName, self.company),
            (FilterField::Location, self.location),
            (FilterField::TechStack, self.tech_stack),
            (FilterField::MinExperience, self.min_experience),
            (FilterField::MinSalary, self.min_salary),
            (FilterField::EmployeeCount, self.employees),
        ];
        if self.remote {
            set.push((FilterField::Remote, Some("yes".to_string())));
        }
        set.extend(self.extra.into_iter().map(|(field, value)| (field, Some(value))));
        set.into_iter()
            .filter_map(|(field, value)| value.map(|value| StoreEvent::FilterChanged { field, value }))
            .collect()
    }
}

fn print_table(records: &[&ListingRecord]) {
    println!(
        "{:<28} {:<20} {:<18} {:<16} {:>10}",
        "ROLE", "COMPANY", "LOCATION", "SALARY", "EXPERIENCE"
    );
    println!("{}", "-".repeat(96));
    for record in records {
        println!(
            "{:<28} {:<20} {:<18} {:<16} {:>10}",
            truncate(&record.role, 26),
            truncate(&record.company_name, 18),
            truncate(&record.location, 16),
            truncate(&record.salary_range().unwrap_or_else(|| "-".to_string()), 14),
            record
                .min_experience
                .map(|years| format!("{}+ yrs", years))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::try_from(cli.config).context("Invalid configuration")?;
    let command = cli.command.unwrap_or(Commands::Browse);

    let target = match command {
        Commands::Browse => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    let log_path = init_logging(&config, target)?;
    if let Some(path) = &log_path {
        tracing::info!(path = %path.display(), "logging to file");
    }

    let source = HttpListingSource::new(config.endpoint.clone(), config.timeout)
        .context("Failed to build HTTP client")?;
    let state = StoreState::new(config.page_size, config.scroll_threshold);

    match command {
        Commands::Browse => {
            let session = Session::new(Arc::new(source), state);
            tui::run_browse(session).await?;
        }

        Commands::Page { page, json } => {
            let request = PageRequest::for_page(page, config.page_size);
            let listing = source
                .fetch_page(request)
                .await
                .with_context(|| format!("Failed to fetch page {} from {}", page, source.endpoint()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&listing.records)?);
            } else {
                let records: Vec<&ListingRecord> = listing.records.iter().collect();
                print_table(&records);
                if let Some(total) = listing.total_count {
                    println!("\n{} listings on page {} ({} available)", records.len(), page, total);
                }
            }
        }

        Commands::List { pages, filters } => {
            let mut session = Session::new(Arc::new(source), state);
            for event in filters.into_events() {
                session.dispatch(event);
            }

            let loaded = session
                .load_pages(pages)
                .await
                .context("Failed to load listings")?;

            let state = session.state();
            let records: Vec<&ListingRecord> = state.filtered().collect();
            if records.is_empty() {
                println!("No listings matched.");
            } else {
                print_table(&records);
            }
            println!(
                "\n{} of {} listings shown ({} pages loaded)",
                records.len(),
                state.records().len(),
                loaded
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters_of(args: &[&str]) -> Vec<(FilterField, String)> {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::List { filters, .. }) => filters
                .into_events()
                .into_iter()
                .filter_map(|event| match event {
                    StoreEvent::FilterChanged { field, value } => Some((field, value)),
                    _ => None,
                })
                .collect(),
            _ => panic!("expected the list command"),
        }
    }

    #[test]
    fn test_page_zero_is_rejected() {
        assert!(Cli::try_parse_from(["jobfeed", "page", "0"]).is_err());
        let cli = Cli::try_parse_from(["jobfeed", "page"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Page { page: 1, json: false })));
    }

    #[test]
    fn test_list_filter_flags() {
        let filters = filters_of(&[
            "jobfeed",
            "list",
            "--role",
            "backend",
            "--remote",
            "--filter",
            "minBasePay=40",
            "--filter",
            "totalEmployees=51-200",
        ]);
        assert_eq!(
            filters,
            vec![
                (FilterField::Role, "backend".to_string()),
                (FilterField::Remote, "yes".to_string()),
                (FilterField::MinSalary, "40".to_string()),
                (FilterField::EmployeeCount, "51-200".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_rejects_unknown_filter() {
        let err = Cli::try_parse_from(["jobfeed", "list", "--filter", "seniority=lead"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown filter 'seniority'"));
        assert!(Cli::try_parse_from(["jobfeed", "list", "--filter", "remote"]).is_err());
    }
}
