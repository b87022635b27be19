use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use incident_series_search::auth::{hash_password, DEFAULT_COST};
use incident_series_search::config::Config;
use incident_series_search::search::{
    ExtraFields, FieldValue, FilterRequest, QueryCompiler, SearchService,
};
use reqwest::Client;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "iss-cli")]
#[command(about = "Incident series search CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the query document a filter set compiles to
    Compile {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Run a filter set against the configured engine
    Search {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Search a series through a running server
    Remote {
        /// Bearer token from `login`
        #[arg(short, long, env = "ISS_TOKEN")]
        token: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Obtain a bearer token
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "ISS_PASSWORD")]
        password: String,
    },

    /// Create a user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "ISS_PASSWORD")]
        password: String,
    },

    /// Print a bcrypt hash suitable for the users table
    HashPassword {
        #[arg(value_name = "PASSWORD")]
        password: String,

        #[arg(short, long, default_value_t = DEFAULT_COST)]
        cost: u32,
    },

    /// Check server health
    Health,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(value_name = "SERIES_ID")]
    series_id: String,

    #[arg(long, default_value = "0")]
    start: usize,

    #[arg(long, default_value = "100")]
    limit: usize,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    date_start: Option<String>,

    #[arg(long)]
    date_end: Option<String>,

    #[arg(long)]
    age_start: Option<u32>,

    #[arg(long)]
    age_end: Option<u32>,

    #[arg(long)]
    gender: Option<String>,

    #[arg(long)]
    min_involved: Option<u32>,

    #[arg(long)]
    driver_fled: bool,

    #[arg(long)]
    caused_death: bool,

    /// Oldest first
    #[arg(long)]
    ascending: bool,

    /// Extra nested constraint, repeatable: `graph.onto:role=driver`
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    fields: Vec<(String, FieldValue)>,
}

fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let value = match value {
        "true" => FieldValue::Flag(true),
        "false" => FieldValue::Flag(false),
        other => other
            .parse::<i64>()
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(other.to_string())),
    };

    Ok((key.to_string(), value))
}

impl FilterArgs {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("start", self.start.to_string()),
            ("limit", self.limit.to_string()),
            ("descending", (!self.ascending).to_string()),
        ];

        let optional = [
            ("location", self.location.clone()),
            ("dateStart", self.date_start.clone()),
            ("dateEnd", self.date_end.clone()),
            ("ageStart", self.age_start.map(|v| v.to_string())),
            ("ageEnd", self.age_end.map(|v| v.to_string())),
            ("gender", self.gender.clone()),
            ("minInvolved", self.min_involved.map(|v| v.to_string())),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value))),
        );

        if self.driver_fled {
            pairs.push(("driverFled", "true".to_string()));
        }
        if self.caused_death {
            pairs.push(("causedDeath", "true".to_string()));
        }

        pairs
    }

    fn into_request(self, extra_fields: ExtraFields) -> FilterRequest {
        FilterRequest::new(self.series_id)
            .with_start(self.start)
            .with_limit(self.limit)
            .with_location(self.location.unwrap_or_default())
            .with_date_range(self.date_start, self.date_end)
            .with_age_range(self.age_start, self.age_end)
            .with_gender(self.gender.unwrap_or_default())
            .with_driver_fled(self.driver_fled)
            .with_caused_death(self.caused_death)
            .with_min_involved(self.min_involved)
            .with_extra_fields(extra_fields)
            .with_descending(!self.ascending)
    }
}

async fn print_json(response: reqwest::Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: serde_json::Value = response.json().await.context("response was not JSON")?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("server answered {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Compile { mut filters } => {
            let config = Config::load().context("failed to load configuration")?;
            let fields = std::mem::take(&mut filters.fields);
            let extra_fields = ExtraFields::from_pairs(fields, &config.search.allow_list())?;

            let compiler = QueryCompiler::new(config.search.compiler_settings());
            let query = compiler.compile(&filters.into_request(extra_fields));
            println!("{}", serde_json::to_string_pretty(&query.to_body())?);
        }

        Commands::Search { mut filters } => {
            let config = Config::load().context("failed to load configuration")?;
            let fields = std::mem::take(&mut filters.fields);
            let extra_fields = ExtraFields::from_pairs(fields, &config.search.allow_list())?;

            let service = SearchService::new(&config.search)?;
            let response = service.search(&filters.into_request(extra_fields)).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Remote { token, filters } => {
            let url = format!("{}/series/{}", cli.endpoint, filters.series_id);
            let request = if filters.fields.is_empty() {
                client.get(&url)
            } else {
                let body: BTreeMap<_, _> = filters.fields.iter().cloned().collect();
                client.post(&url).json(&body)
            };

            let response = request
                .query(&filters.query_pairs())
                .bearer_auth(token)
                .send()
                .await?;
            print_json(response).await?;
        }

        Commands::Login { username, password } => {
            let response = client
                .post(format!("{}/auth/token", cli.endpoint))
                .form(&[("username", username), ("password", password)])
                .send()
                .await?;
            print_json(response).await?;
        }

        Commands::Register { username, password } => {
            let response = client
                .post(format!("{}/register", cli.endpoint))
                .json(&serde_json::json!({
                    "username": username,
                    "password": password,
                }))
                .send()
                .await?;
            print_json(response).await?;
        }

        Commands::HashPassword { password, cost } => {
            println!("{}", hash_password(&password, cost)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;
            print_json(response).await?;
        }
    }

    Ok(())
}
