use std::path::{Path, PathBuf};

use clap::{Parser as ClapParser, Subcommand as ClapSubcommand};
use ethroot_cross_check::{
    FixtureSet, RunnerOptions, Summary,
    modules::{
        parser::{Fixture, parse_file},
        raw::{RawData, check_header_fixture, fetch_raw, verify_raw},
        runner::run_root_fixtures,
        types::RawFixture,
    },
};
use ethroot_rpc::{BlockIdentifier, EthClient};
use tracing::{Level, info, warn};

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(name = "ethroot", author, version = VERSION_STRING, about, long_about = None)]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapParser)]
pub struct Options {
    #[arg(long = "log.level", default_value_t = Level::INFO, value_name = "LOG_LEVEL", global = true)]
    pub log_level: Level,
}

#[derive(ClapSubcommand)]
pub enum Subcommand {
    #[command(
        name = "fixtures",
        about = "Derive fixture roots with every backend and ordering, and verify recorded raw encodings"
    )]
    Fixtures {
        #[command(flatten)]
        runner: RunnerOptions,
    },
    #[command(
        name = "raw",
        about = "Fetch raw header, block and receipts from a node and verify them against a local JSON copy"
    )]
    Raw {
        #[arg(
            long = "rpc-url",
            env = "RPC_URL",
            value_name = "URL",
            value_delimiter = ',',
            required = true
        )]
        rpc_urls: Vec<String>,
        #[arg(long, value_name = "PATH", help = "Raw fixture holding the JSON copy of the block")]
        fixture: PathBuf,
        #[arg(
            long,
            value_name = "BLOCK",
            help = "Block to fetch instead of the fixture's own number. Number, 0x number or tag."
        )]
        block: Option<BlockIdentifier>,
    },
}

impl Subcommand {
    pub async fn run(self) -> eyre::Result<Summary> {
        match self {
            Subcommand::Fixtures { runner } => run_fixtures(&runner),
            Subcommand::Raw {
                rpc_urls,
                fixture,
                block,
            } => run_raw(rpc_urls, &fixture, block).await,
        }
    }
}

fn run_fixtures(options: &RunnerOptions) -> eyre::Result<Summary> {
    let fixtures = FixtureSet::load(options)?;
    if fixtures.is_empty() {
        eyre::bail!("No fixtures found under {}", options.path.display());
    }

    let mut summary = run_root_fixtures(&fixtures.roots);
    for header in &fixtures.headers {
        summary.extend(check_header_fixture(header));
    }
    for raw in &fixtures.raw {
        summary.extend(verify_raw(raw, &RawData::from_fixture(raw)));
    }
    Ok(summary)
}

async fn run_raw(
    rpc_urls: Vec<String>,
    fixture_path: &Path,
    block: Option<BlockIdentifier>,
) -> eyre::Result<Summary> {
    let mut fixture: RawFixture = parse_file(fixture_path)?;
    fixture.set_path(fixture_path);
    let block = block.unwrap_or(BlockIdentifier::Number(fixture.block_number()));
    if block != BlockIdentifier::Number(fixture.block_number()) {
        warn!(%block, fixture_block = fixture.block_number(), "Fetching a block other than the fixture's");
    }

    let client = EthClient::new_with_multiple_urls(rpc_urls)?;
    let raw = fetch_raw(&client, block).await?;
    info!(fixture = %fixture.name, %block, "Verifying raw data");
    Ok(Summary::new(verify_raw(&fixture, &raw)))
}
