use clap::Parser;
use workout_planner_lib::cli::Cli;

#[tokio::main]
async fn main() {
  let cli = Cli::parse();

  if let Err(e) = workout_planner_lib::run(cli).await {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }
}
