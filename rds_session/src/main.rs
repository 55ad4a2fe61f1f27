use foundations::{
  BootstrapResult,
  cli::{Arg, ArgAction, Cli},
};
use rds_session::{
  Session, SessionInfo, SessionOutcome, SessionSettings,
  headless::{HeadlessDisplay, StdinResponses},
};

#[macro_use]
extern crate tracing;

fn main() -> BootstrapResult<()> {
  tracing_subscriber::fmt::fmt().init();

  let service_info = foundations::service_info!();

  // Parse command line arguments.  `--dry-run` checks the config without starting a session.
  let cli = Cli::<SessionSettings>::new(&service_info, vec![
    Arg::new("dry-run")
      .long("dry-run")
      .action(ArgAction::SetTrue)
      .help("Validate or generate config without running a session"),
  ])?;

  if cli.arg_matches.get_one::<String>("generate").is_some() {
    return Ok(());
  }

  let settings = &cli.settings;
  settings.validate()?;
  if cli.arg_matches.get_flag("dry-run") {
    info!("Config is valid");
    return Ok(());
  }

  let rng = match settings.rng_seed {
    Some(seed) => common::build_rng(seed),
    None => common::entropy_rng(),
  };
  let display = HeadlessDisplay::new(settings.headless.refresh_hz, settings.headless.pace_frames);
  let responses = StdinResponses::spawn();
  info!("Answer with `1` (squashed) or `2` (stretched) followed by enter; `q` quits");

  let mut session = Session::new(settings, SessionInfo::now(settings), display, responses, rng)?;
  match session.run()? {
    SessionOutcome::Completed { trials } => info!("Session complete: {trials} trials"),
    SessionOutcome::Aborted { trials } => info!("Session stopped early after {trials} trials"),
  }

  Ok(())
}
