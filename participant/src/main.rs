mod scripted;

use biped_lib::{init_tracing, Controller, ControllerConfig, FallState, TickOutcome};
use clap::Parser;
use eyre::Result;
use tracing::{info, warn};

use crate::scripted::{Scenario, ScriptedRobot};

#[derive(Parser)]
#[command(name = "participant")]
#[command(about = "Run the biped controller against a scripted robot")]
struct Cli {
    #[arg(short, long, env = "BIPED_CONFIG", default_value = "config/participant.toml")]
    config: String,

    /// Number of control ticks to run
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Overrides the configured tick duration
    #[arg(long)]
    time_step_ms: Option<u32>,

    #[arg(short, long, value_enum, default_value_t = Scenario::Walk)]
    scenario: Scenario,

    /// Tick at which the scripted robot falls
    #[arg(long, default_value_t = 120)]
    fall_tick: u64,

    /// Print one JSON telemetry line per tick
    #[arg(long)]
    telemetry: bool,
}

#[derive(Debug, Default)]
struct RunSummary {
    walking: u64,
    recovering: u64,
    falls: u64,
    previous: Option<FallState>,
}

impl RunSummary {
    fn record(&mut self, outcome: TickOutcome) {
        let state = match outcome {
            TickOutcome::Walking => {
                self.walking += 1;
                FallState::NoFall
            }
            TickOutcome::Recovering(state) => {
                self.recovering += 1;
                state
            }
        };
        if state != FallState::NoFall && self.previous.unwrap_or(FallState::NoFall) == FallState::NoFall {
            self.falls += 1;
        }
        self.previous = Some(state);
    }
}

fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    info!("Loading controller config from: {}", cli.config);
    let mut config = ControllerConfig::load_from_file(&cli.config)?;
    if let Some(time_step_ms) = cli.time_step_ms {
        config.time_step_ms = time_step_ms;
    }
    config.validate()?;

    let mut controller = Controller::new(&config)?;
    let mut robot = ScriptedRobot::new(cli.scenario, cli.fall_tick)?;
    let time_step = config.time_step_s();

    info!(
        "Running {} ticks of {} ms, scenario {:?}",
        cli.ticks, config.time_step_ms, cli.scenario
    );

    let mut summary = RunSummary::default();
    for tick in 0..cli.ticks {
        let time = tick as f64 * time_step;
        let outcome = controller.tick(&mut robot, time)?;
        summary.record(outcome);

        if cli.telemetry {
            println!("{}", serde_json::to_string(&controller.telemetry(time))?);
        }
        robot.step();
    }

    info!(
        "Done after {} ticks: {} walking, {} recovering, {} falls",
        robot.tick(),
        summary.walking,
        summary.recovering,
        summary.falls
    );
    if controller.fall_state() != FallState::NoFall {
        warn!("Run ended in {}", controller.fall_state());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scenario: Scenario, ticks: u64) -> (RunSummary, Controller) {
        let config = ControllerConfig::default();
        let mut controller = Controller::new(&config).unwrap();
        let mut robot = ScriptedRobot::new(scenario, 20).unwrap();
        let mut summary = RunSummary::default();
        for tick in 0..ticks {
            summary.record(controller.tick(&mut robot, tick as f64 * config.time_step_s()).unwrap());
            robot.step();
        }
        (summary, controller)
    }

    #[test]
    fn walking_never_falls() {
        let (summary, controller) = run(Scenario::Walk, 200);
        assert_eq!(summary.walking, 200);
        assert_eq!(summary.falls, 0);
        assert_eq!(controller.fall_state(), FallState::NoFall);
    }

    #[test]
    fn every_fall_scenario_gets_back_up() {
        for scenario in [Scenario::FrontFall, Scenario::BackFall, Scenario::SideFall] {
            let (summary, controller) = run(scenario, 400);
            assert_eq!(summary.falls, 1, "{scenario:?}");
            assert!(summary.recovering > 0);
            assert_eq!(controller.fall_state(), FallState::NoFall, "{scenario:?}");
        }
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::parse_from([
            "participant",
            "--config",
            "custom.toml",
            "--ticks",
            "10",
            "--scenario",
            "side-fall",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.ticks, 10);
        assert_eq!(cli.scenario, Scenario::SideFall);
    }
}
