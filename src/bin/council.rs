use std::time::Duration;

use log::info;
use structopt::StructOpt;

use council_election::{BehaviorProfile, Cluster, Config};

#[derive(StructOpt, Debug)]
#[structopt(name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
struct Opt {
    /// Number of council members.
    #[structopt(short, long, default_value = "9")]
    members: u64,

    /// Member id listens on base-port + id.
    #[structopt(short, long, default_value = "5000")]
    base_port: u16,

    /// Disable fault injection; every member answers promptly.
    #[structopt(long)]
    reliable: bool,

    /// Proposer labels, started one second apart.
    #[structopt(short, long, default_value = "M1,M2,M3", use_delimiter = true)]
    proposers: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    info!("Starting Council Election...");
    let config = Config::new(opt.members).with_base_port(opt.base_port);
    let behavior = if opt.reliable {
        BehaviorProfile::reliable()
    } else {
        BehaviorProfile::faulty()
    };

    let mut cluster = Cluster::new(config, behavior);
    cluster.start_acceptors();
    let missing = cluster.wait_ready().await;
    if !missing.is_empty() {
        anyhow::bail!("members {:?} failed to start", missing);
    }

    // Stagger the proposers one second apart; their rounds may overlap.
    let mut rounds = Vec::new();
    for label in &opt.proposers {
        tokio::time::sleep(Duration::from_secs(1)).await;
        rounds.push((label.clone(), cluster.spawn_proposer(label)));
    }

    for (label, round) in rounds {
        let outcome = round.await?;
        if outcome.elected() {
            info!("Proposal by {} is successfully elected.", label);
        } else {
            info!("Proposal by {} is rejected.", label);
        }
        println!(
            "{}: {} YES, {} NO, {:?}",
            label, outcome.yes_votes, outcome.no_votes, outcome.verdict
        );
    }
    Ok(())
}
