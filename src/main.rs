use clap::Parser;
use cutting_stock::annealing::AnnealingConfig;
use cutting_stock::greedy::{GreedyConfig, PatternRanking};
use cutting_stock::pattern::WastePolicy;
use cutting_stock::report::build_report;
use cutting_stock::solver::{Solver, Strategy};
use cutting_stock::types::{Catalogue, OrderItem, StockType};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cutting_stock",
    about = "1D cutting stock optimizer for mixed bar lengths and costs"
)]
struct Cli {
    /// JSON file with "stocks" and "items" arrays
    #[arg(long)]
    input: Option<String>,

    /// Stock bar types as ID:LENGTH:COST (e.g. A:80:90 B:100:110)
    #[arg(long = "stock", num_args = 1.., value_parser = parse_stock)]
    stocks: Vec<StockType>,

    /// Demanded items as ID:LENGTH:DEMAND (e.g. X:20:5 Y:30:3)
    #[arg(long = "item", num_args = 1.., value_parser = parse_item)]
    items: Vec<OrderItem>,

    /// Strategy: ffd, greedy, or annealing
    #[arg(long, default_value = "ffd", value_parser = parse_strategy)]
    strategy: StrategyKind,

    /// Greedy pattern ranking: piece-count or pieces-per-length
    #[arg(long, default_value = "piece-count", value_parser = parse_ranking)]
    ranking: PatternRanking,

    /// Leftover rule for generated patterns: strict or relaxed
    /// (default: relaxed for greedy, strict for annealing)
    #[arg(long, value_parser = parse_waste_policy)]
    waste_policy: Option<WastePolicy>,

    /// Annealing: initial temperature
    #[arg(long, default_value_t = 1000.0)]
    temperature: f64,

    /// Annealing: geometric cooling rate in (0, 1)
    #[arg(long, default_value_t = 0.995)]
    cooling_rate: f64,

    /// Annealing: number of iterations
    #[arg(long, default_value_t = 500)]
    iterations: usize,

    /// Annealing: random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Annealing: wall-clock budget in milliseconds (0 = none)
    #[arg(long, default_value_t = 0)]
    time_limit_ms: u64,

    /// Annealing: independent parallel restarts
    #[arg(long, default_value_t = 1)]
    restarts: usize,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,

    /// Log solver progress to stderr
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy)]
enum StrategyKind {
    Ffd,
    Greedy,
    Annealing,
}

fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    match s {
        "ffd" => Ok(StrategyKind::Ffd),
        "greedy" => Ok(StrategyKind::Greedy),
        "annealing" | "sa" => Ok(StrategyKind::Annealing),
        _ => Err(format!(
            "invalid strategy '{}', expected: ffd, greedy, or annealing",
            s
        )),
    }
}

fn parse_ranking(s: &str) -> Result<PatternRanking, String> {
    match s {
        "piece-count" => Ok(PatternRanking::PieceCount),
        "pieces-per-length" => Ok(PatternRanking::PiecesPerLength),
        _ => Err(format!(
            "invalid ranking '{}', expected: piece-count or pieces-per-length",
            s
        )),
    }
}

fn parse_waste_policy(s: &str) -> Result<WastePolicy, String> {
    match s {
        "strict" => Ok(WastePolicy::Strict),
        "relaxed" => Ok(WastePolicy::Relaxed),
        _ => Err(format!(
            "invalid waste policy '{}', expected: strict or relaxed",
            s
        )),
    }
}

fn split_triple(s: &str, last: &str) -> Result<(String, u32, String), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 || parts[0].is_empty() {
        return Err(format!("invalid value '{}', expected ID:LENGTH:{}", s, last));
    }
    let length = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    if length == 0 {
        return Err(format!("length must be non-zero in '{}'", s));
    }
    Ok((parts[0].to_string(), length, parts[2].to_string()))
}

fn parse_stock(s: &str) -> Result<StockType, String> {
    let (id, length, cost) = split_triple(s, "COST")?;
    let cost = cost
        .parse::<f64>()
        .map_err(|_| format!("invalid cost in '{}'", s))?;
    if !cost.is_finite() || cost <= 0.0 {
        return Err(format!("cost must be positive in '{}'", s));
    }
    Ok(StockType::new(id, length, cost))
}

fn parse_item(s: &str) -> Result<OrderItem, String> {
    let (id, length, demand) = split_triple(s, "DEMAND")?;
    let demand = demand
        .parse::<u32>()
        .map_err(|_| format!("invalid demand in '{}'", s))?;
    Ok(OrderItem::new(id, length, demand))
}

fn load_catalogue(path: &str) -> Result<Catalogue, String> {
    let text =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid problem file '{}': {}", path, e))
}

fn strategy_from(cli: &Cli) -> Strategy {
    match cli.strategy {
        StrategyKind::Ffd => Strategy::Ffd,
        StrategyKind::Greedy => {
            let mut config = GreedyConfig {
                ranking: cli.ranking,
                ..GreedyConfig::default()
            };
            if let Some(policy) = cli.waste_policy {
                config.waste_policy = policy;
            }
            Strategy::Greedy(config)
        }
        StrategyKind::Annealing => {
            let mut config = AnnealingConfig::new()
                .with_temperature(cli.temperature)
                .with_cooling_rate(cli.cooling_rate)
                .with_max_iterations(cli.iterations)
                .with_time_limit_ms(cli.time_limit_ms)
                .with_restarts(cli.restarts);
            if let Some(seed) = cli.seed {
                config = config.with_seed(seed);
            }
            if let Some(policy) = cli.waste_policy {
                config = config.with_waste_policy(policy);
            }
            Strategy::Annealing(config)
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut catalogue = match &cli.input {
        Some(path) => load_catalogue(path).unwrap_or_else(|e| fail(e)),
        None => Catalogue::default(),
    };
    catalogue.stocks.extend(cli.stocks.iter().cloned());
    catalogue.items.extend(cli.items.iter().cloned());

    let problem = catalogue.into_problem().unwrap_or_else(|e| fail(e));
    let solver = Solver::new(problem, strategy_from(&cli));
    let plan = solver.solve().unwrap_or_else(|e| fail(e));
    let report = build_report(&plan, solver.problem());

    let output = if cli.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    };
    match output {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }

    if !report.demand_met {
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stock_and_item() {
        let stock = parse_stock("A:80:90").unwrap();
        assert_eq!(stock, StockType::new("A", 80, 90.0));
        let item = parse_item("X:20:5").unwrap();
        assert_eq!(item, OrderItem::new("X", 20, 5));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_stock("A:80").is_err());
        assert!(parse_stock("A:0:90").is_err());
        assert!(parse_stock("A:80:-1").is_err());
        assert!(parse_stock(":80:90").is_err());
        assert!(parse_item("X:twenty:5").is_err());
        assert!(parse_item("X:20:-5").is_err());
    }

    #[test]
    fn test_parse_options() {
        assert!(matches!(parse_strategy("sa"), Ok(StrategyKind::Annealing)));
        assert!(parse_strategy("branch-and-bound").is_err());
        assert_eq!(
            parse_ranking("pieces-per-length"),
            Ok(PatternRanking::PiecesPerLength)
        );
        assert_eq!(parse_waste_policy("relaxed"), Ok(WastePolicy::Relaxed));
        assert!(parse_waste_policy("loose").is_err());
    }

    #[test]
    fn test_cli_builds_annealing_strategy() {
        let cli = Cli::parse_from([
            "cutting_stock",
            "--stock",
            "A:80:90",
            "--item",
            "X:20:5",
            "--strategy",
            "annealing",
            "--seed",
            "4",
            "--iterations",
            "25",
        ]);
        let expected = AnnealingConfig::new().with_max_iterations(25).with_seed(4);
        assert_eq!(strategy_from(&cli), Strategy::Annealing(expected));
    }

    #[test]
    fn test_cli_greedy_waste_policy() {
        let args = ["cutting_stock", "--item", "X:30:4", "--strategy", "greedy"];
        let cli = Cli::parse_from(args);
        assert_eq!(strategy_from(&cli), Strategy::Greedy(GreedyConfig::default()));

        let cli = Cli::parse_from(args.iter().copied().chain(["--waste-policy", "strict"]));
        assert_eq!(
            strategy_from(&cli),
            Strategy::Greedy(GreedyConfig::new(PatternRanking::PieceCount, WastePolicy::Strict))
        );
    }
}
