use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the starter catalog into an empty Redis store
    Seed {
        /// Overrides REDIS_URL
        #[arg(long)]
        redis_url: Option<String>,
    },

    /// Print how far apart two RFC 3339 instants are
    Elapsed { from: String, to: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Seed { redis_url } => {
            winter::init_tracing();

            let inserted = process::seed_store(redis_url).await?;
            if inserted == 0 {
                println!("Store already has activities. Exiting.");
            } else {
                println!("Seeded Activities: {inserted}");
            }
        }
        Command::Elapsed { from, to } => {
            println!("{}", process::elapsed_message(&from, &to)?);
        }
    }

    Ok(())
}
